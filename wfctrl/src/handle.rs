mod workflow_object;

pub use workflow_object::WorkflowObjectCtrl;
