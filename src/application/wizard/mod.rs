//! Step-by-step survey filling: a pure state machine plus a driver that
//! performs its store calls strictly in sequence.

mod driver;
mod gateway;
mod local;
mod state;

pub use driver::{DEFAULT_CALL_TIMEOUT, WizardDriver, WizardError};
pub use gateway::{GatewayError, SurveyGateway};
pub use local::LocalGateway;
pub use state::{TransitionError, Wizard, WizardEffect, WizardPhase};
