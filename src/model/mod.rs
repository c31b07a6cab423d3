//! Domain model shared by the engine, gateways and hosts.

pub mod error;
pub mod item;
pub mod page;
pub mod url_params;

pub use error::{AppError, EngineError, GatewayError};
pub use item::Identify;
pub use page::{Ordering, Page, PageArgs, PageInfo, QueryType, SortDirection};
pub use url_params::{UrlParamNames, UrlParams};
