pub mod normalizer;
pub mod poller;
pub mod probe;

pub use normalizer::{ResponseShape, ResultNormalizer};
pub use poller::{JobPoller, PollEvent, PollHandle, PollOutcome, PollRound};
pub use probe::{HttpProbe, ProbeStatus, ReadinessProbe};
