use structlink::engine::config as core_config;

pub struct AppConfig {
    pub gateway: core_config::GatewayConfig,
    pub network: core_config::NetworkConfig,
    pub columns: core_config::ColumnConfig,
}
