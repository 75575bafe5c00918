//! Payment gateway vocabulary shared by adapters and handlers.

mod event;
mod kind;
mod result;

pub use event::{GatewayEvent, GatewayEventKind};
pub use kind::GatewayKind;
pub use result::{GatewayErrorCode, GatewayResult};
