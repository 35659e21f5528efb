use wfcore::{
    approval::ApprovalStatus,
    error::ConsistencyError,
    schema::{
        ApprovalRecord,
        ApprovalSchema,
        RecordSet,
        StatusEncoding,
    },
};

pub(crate) fn decode(approval: &ApprovalRecord) -> Result<ApprovalStatus, ConsistencyError> {
    approval.status.decode()
        .map_err(|_| ConsistencyError::UnmappableStatus {
            id: approval.id,
            value: approval.status.to_string(),
        })
}

/// Rewrites every approval status in the given encoding.
pub fn encode(
    records: RecordSet,
    encoding: StatusEncoding,
) -> Result<RecordSet, ConsistencyError> {
    let approvals = records.approvals
        .into_iter()
        .map(|mut approval| -> Result<ApprovalRecord, ConsistencyError> {
            approval.status = encoding.encode(decode(&approval)?);
            Ok(approval)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RecordSet {
        schema: ApprovalSchema {
            status: encoding,
            .. records.schema
        },
        approvals,
        .. records
    })
}

#[cfg(test)]
mod tests {
    use wfcore::schema::StatusValue;
    use crate::reconcile::testing;
    use super::*;

    #[test]
    fn to_integer() -> anyhow::Result<()> {
        let records = encode(testing::self_loop(), StatusEncoding::Integer)?;
        assert_eq!(records.schema.status, StatusEncoding::Integer);
        assert_eq!(
            records.approvals.iter()
                .map(|a| a.status.clone())
                .collect::<Vec<_>>(),
            [1, 3, 1, 3, 0, 0].map(StatusValue::Integer),
        );
        Ok(())
    }

    #[test]
    fn unmappable() {
        let mut records = testing::self_loop();
        records.approvals[3].status = StatusValue::Symbolic("withdrawn".into());
        assert_eq!(
            encode(records, StatusEncoding::Integer),
            Err(ConsistencyError::UnmappableStatus {
                id: 4,
                value: "\"withdrawn\"".into(),
            }),
        );

        let mut records = encode(testing::self_loop(), StatusEncoding::Integer)
            .expect("encodes");
        records.approvals[0].status = StatusValue::Integer(9);
        assert!(matches!(
            encode(records, StatusEncoding::Symbolic),
            Err(ConsistencyError::UnmappableStatus { id: 1, .. }),
        ));
    }
}
