//! 服务发现模块
//!
//! 两种发现来源：权威但可选的注册中心（Consul / 静态表），
//! 以及在注册中心为空时对候选端口的主动探测。

pub mod backend;
pub mod instance;
pub mod registry;
pub mod scanner;

pub use backend::{ConsulRegistry, create_registry};
pub use instance::Endpoint;
pub use registry::{RegistryClient, StaticRegistry};
pub use scanner::{PortCatalog, PortScanner};
