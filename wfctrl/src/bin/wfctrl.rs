use clap::{
    ArgAction,
    Parser,
    Subcommand,
};
use itertools::Itertools;
use std::{
    fs,
    io::{
        stdin,
        BufReader,
    },
};
use wfcore::{
    ac::{
        Principal,
        User,
    },
    approval::ApprovalStatus,
    platform::ConnectorOption,
    workflow::{
        WorkflowDef,
        WorkflowGraph,
    },
};
use wfctrl::{
    handle::WorkflowObjectCtrl,
    platform::{
        Builder,
        Platform,
    },
    policy::{
        BranchPolicy,
        RejectionPolicy,
    },
    reconcile::{
        self,
        Reconciliation,
    },
};
use wfdb::Backend;
use wfrbac::Builder as AuthorityBuilder;

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[clap(long, value_name = "WF_DB_URL", env = "WF_DB_URL")]
    wf_db_url: String,
    #[clap(
        long,
        value_name = "WF_AUTO_CREATE_DB",
        env = "WF_AUTO_CREATE_DB",
        action = ArgAction::Set,
        default_value_t = true,
        default_missing_value = "true",
    )]
    wf_auto_create_db: bool,
    /// JSON file with the permits and memberships of the authority.
    #[clap(long, value_name = "WF_AUTHORITY", env = "WF_AUTHORITY")]
    wf_authority: Option<String>,
    /// Enforce the authority records through casbin.
    #[clap(long, action = ArgAction::SetTrue)]
    casbin: bool,
    #[clap(long, value_enum, default_value_t = BranchPolicy::default())]
    branch_policy: BranchPolicy,
    #[clap(long, value_enum, default_value_t = RejectionPolicy::default())]
    rejection_policy: RejectionPolicy,
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(arg_required_else_help = true)]
    Workflow {
        #[command(subcommand)]
        cmd: WorkflowCmd,
    },
    #[command(arg_required_else_help = true)]
    Object {
        #[command(subcommand)]
        cmd: ObjectCmd,
    },
    #[command(arg_required_else_help = true)]
    Approvals {
        workflow_id: i64,
        #[clap(long, value_enum, default_value_t = ApprovalStatus::Pending)]
        status: ApprovalStatus,
    },
    #[command(arg_required_else_help = true)]
    Schema {
        #[command(subcommand)]
        cmd: SchemaCmd,
    },
}

#[derive(Debug, Subcommand)]
enum WorkflowCmd {
    /// Registers a workflow definition read from the file, or stdin.
    Load {
        input: Option<String>,
    },
    List,
    #[command(arg_required_else_help = true)]
    Show {
        id: i64,
    },
}

#[derive(Debug, Subcommand)]
enum ObjectCmd {
    #[command(arg_required_else_help = true)]
    Register {
        workflow_id: i64,
        object_id: String,
    },
    #[command(arg_required_else_help = true)]
    Show {
        workflow_id: i64,
        object_id: String,
    },
    #[command(arg_required_else_help = true)]
    Approve {
        workflow_id: i64,
        object_id: String,
        #[command(flatten)]
        actor: Actor,
    },
    #[command(arg_required_else_help = true)]
    Reject {
        workflow_id: i64,
        object_id: String,
        #[command(flatten)]
        actor: Actor,
    },
}

#[derive(Debug, clap::Args)]
struct Actor {
    #[clap(long)]
    user_id: i64,
    #[clap(long)]
    user_name: String,
    /// Label of the state to move towards.
    #[clap(long)]
    next_state: Option<String>,
}

#[derive(Debug, Subcommand)]
enum SchemaCmd {
    Status,
    #[command(arg_required_else_help = true)]
    Reconcile {
        #[clap(value_enum)]
        target: Reconciliation,
    },
}

impl Actor {
    fn principal(&self) -> Principal {
        User {
            id: self.user_id,
            name: self.user_name.clone(),
        }.into()
    }

    fn next_state(&self, ctrl: &WorkflowObjectCtrl<'_>) -> anyhow::Result<Option<i64>> {
        Ok(self.next_state.as_deref()
            .map(|label| ctrl.state_id(label))
            .transpose()?)
    }
}

fn print_graph(graph: &WorkflowGraph) {
    let workflow = graph.workflow();
    let label = |id: i64| graph.state(id)
        .map(|state| state.label.as_str())
        .unwrap_or("?");
    println!(
        "workflow {} for {}.{} (initial state: {})",
        workflow.id,
        workflow.content_type,
        workflow.field_name,
        label(workflow.initial_state_id),
    );
    for meta in graph.transition_metas() {
        println!(
            "  {}: {} -> {}",
            meta.id,
            label(meta.source_state_id),
            label(meta.destination_state_id),
        );
        for step in graph.approval_metas_of(meta.id) {
            println!(
                "    step {} (priority {}): permissions [{}], users [{}]",
                step.id,
                step.priority,
                step.permissions.iter().join(", "),
                step.users.iter().join(", "),
            );
        }
    }
}

fn print_object(ctrl: &WorkflowObjectCtrl<'_>) {
    let object = ctrl.object();
    println!(
        "object {} ({}) in state {} [{:?}], version {}",
        object.object_id,
        object.id,
        ctrl.state().map(|state| state.label.as_str()).unwrap_or("?"),
        ctrl.status(),
        object.version,
    );
    for approval in ctrl.next_approvals() {
        println!(
            "  awaiting approval {} (step {}, iteration {})",
            approval.id,
            approval.approval_meta_id,
            approval.iteration,
        );
    }
}

async fn platform(args: &Cli) -> anyhow::Result<Platform> {
    let mut authority = if args.casbin {
        AuthorityBuilder::casbin()
    } else {
        AuthorityBuilder::new()
    };
    if let Some(path) = &args.wf_authority {
        authority = authority.records_json(&fs::read_to_string(path)?)?;
    }
    let wf_platform = Backend::wf(
        ConnectorOption::from(&args.wf_db_url)
            .auto_create_db(args.wf_auto_create_db)
    )
        .await
        .map_err(anyhow::Error::from_boxed)?;
    Ok(Builder::new()
        .arc_wf_platform(wf_platform)
        .boxed_authority(authority.build().await?)
        .branch_policy(args.branch_policy)
        .rejection_policy(args.rejection_policy)
        .build())
}

async fn parse_workflow(args: &Cli, cmd: &WorkflowCmd) -> anyhow::Result<()> {
    let platform = platform(args).await?;
    match cmd {
        WorkflowCmd::Load { input } => {
            let def: WorkflowDef = match input {
                Some(path) => serde_json::from_reader(BufReader::new(fs::File::open(path)?))?,
                None => serde_json::from_reader(BufReader::new(stdin()))?,
            };
            let id = platform.register_workflow(&def).await?;
            println!("registered workflow {id}");
        }
        WorkflowCmd::List => {
            for workflow in platform.list_workflows().await? {
                println!(
                    "{}: {}.{}",
                    workflow.id,
                    workflow.content_type,
                    workflow.field_name,
                );
            }
        }
        WorkflowCmd::Show { id } => {
            print_graph(&*platform.get_graph(*id).await?);
        }
    }
    Ok(())
}

async fn parse_object(args: &Cli, cmd: &ObjectCmd) -> anyhow::Result<()> {
    let platform = platform(args).await?;
    match cmd {
        ObjectCmd::Register { workflow_id, object_id } => {
            let ctrl = platform.register_object(*workflow_id, object_id).await?;
            print_object(&ctrl);
        }
        ObjectCmd::Show { workflow_id, object_id } => {
            let ctrl = platform.get_object(*workflow_id, object_id).await?;
            print_object(&ctrl);
            if let Some(approval) = ctrl.recent_approval() {
                println!(
                    "  most recent approval {} by user {:?}",
                    approval.id,
                    approval.transactioner,
                );
            }
        }
        ObjectCmd::Approve { workflow_id, object_id, actor } => {
            let mut ctrl = platform.get_object(*workflow_id, object_id).await?;
            let next_state = actor.next_state(&ctrl)?;
            ctrl.approve(&actor.principal(), next_state).await?;
            print_object(&ctrl);
        }
        ObjectCmd::Reject { workflow_id, object_id, actor } => {
            let mut ctrl = platform.get_object(*workflow_id, object_id).await?;
            let next_state = actor.next_state(&ctrl)?;
            ctrl.reject(&actor.principal(), next_state).await?;
            print_object(&ctrl);
        }
    }
    Ok(())
}

async fn parse_approvals(
    args: &Cli,
    workflow_id: i64,
    status: ApprovalStatus,
) -> anyhow::Result<()> {
    let platform = platform(args).await?;
    let approvals = platform.wf_platform()
        .list_approvals_by_status(workflow_id, status)
        .await?;
    let output = serde_json::to_string_pretty(&approvals)?;
    println!("{output}");
    Ok(())
}

async fn parse_schema(args: &Cli, cmd: &SchemaCmd) -> anyhow::Result<()> {
    let platform = Backend::schema(
        ConnectorOption::from(&args.wf_db_url)
            .auto_create_db(args.wf_auto_create_db)
    )
        .await
        .map_err(anyhow::Error::from_boxed)?;
    match cmd {
        SchemaCmd::Status => {
            println!("{}", platform.introspect().await?);
        }
        SchemaCmd::Reconcile { target } => {
            let schema = reconcile::reconcile(&*platform, *target).await?;
            println!("{schema}");
        }
    }
    Ok(())
}

#[async_std::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    stderrlog::new()
        .module(module_path!())
        .module("wfcore")
        .module("wfdb_sqlite")
        .verbosity((args.verbose as usize) + 1)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    match &args.command {
        Commands::Workflow { cmd } => parse_workflow(&args, cmd).await?,
        Commands::Object { cmd } => parse_object(&args, cmd).await?,
        Commands::Approvals { workflow_id, status } => {
            parse_approvals(&args, *workflow_id, *status).await?
        }
        Commands::Schema { cmd } => parse_schema(&args, cmd).await?,
    }
    Ok(())
}
