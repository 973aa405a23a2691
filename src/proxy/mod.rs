//! 反向代理模块

pub mod router;
pub mod upstream;

pub use router::{
    INSTANCE_HEADER, PORT_HEADER, ProxyRouter, build_target_url, forward_headers,
    strip_service_prefix,
};
pub use upstream::{ReqwestUpstream, UpstreamClient, UpstreamRequest};
