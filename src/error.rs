use thiserror::Error;

/// A single step of the node lifecycle, named for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Reconcile,
    Create,
    RestoreImage,
    ApplySizing,
    ResizeDisk,
    Start,
    AwaitReady,
    InjectNetwork,
    DeliverConfig,
    Activate,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Reconcile => "reconcile-absent",
            Step::Create => "create",
            Step::RestoreImage => "restore-image",
            Step::ApplySizing => "apply-sizing",
            Step::ResizeDisk => "resize-disk",
            Step::Start => "start",
            Step::AwaitReady => "await-ready",
            Step::InjectNetwork => "inject-network",
            Step::DeliverConfig => "deliver-config",
            Step::Activate => "activate",
        };
        write!(f, "{}", name)
    }
}

/// Provisioning error taxonomy.
///
/// `Validation` and `Allocation` are reported before any side effect;
/// `Step` and `StartupTimeout` are fatal to the node they name.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error(
        "address allocation overflow: node index {index} needs host octet {octet}, \
         valid range is 1-254"
    )]
    Allocation { index: u32, octet: u32 },

    #[error("step '{step}' failed for node {node_id}")]
    Step {
        step: Step,
        node_id: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("node {node_id} did not report running after {attempts} status checks")]
    StartupTimeout { node_id: u32, attempts: u32 },
}

impl ProvisionError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn step(step: Step, node_id: u32, source: anyhow::Error) -> Self {
        Self::Step {
            step,
            node_id,
            source,
        }
    }
}
