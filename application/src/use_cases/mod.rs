//! Use cases: the coordination core's operations

pub mod classify_turn;
pub mod coordinator;
pub mod create_agents;
pub mod run_collaboration;
pub mod submit_turn;

pub use classify_turn::{Classification, ClassifyTurnUseCase};
pub use coordinator::{CoordinatorService, DecisionView, SessionView};
pub use create_agents::CreateAgentsUseCase;
pub use run_collaboration::{RunCollaborationError, RunCollaborationUseCase};
pub use submit_turn::{SubmitTurnError, SubmitTurnUseCase, TurnOutcome};
