pub fn default_service_name() -> String {
    "bth-trader".to_string()
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_grpc_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_grpc_port() -> u16 {
    5500
}

pub fn default_ws_url() -> String {
    "wss://ws-auth.kraken.com".to_string()
}

pub fn default_rest_url() -> String {
    "https://api.kraken.com".to_string()
}

pub fn default_request_timeout_seconds() -> u64 {
    10
}

pub fn default_event_buffer() -> usize {
    1024
}

pub fn default_gc_interval_ms() -> u64 {
    2000
}

pub fn default_grace_period_seconds() -> u64 {
    60
}

pub fn default_submit_timeout_seconds() -> u64 {
    30
}

pub fn default_stream_buffer() -> usize {
    100
}

pub fn default_metrics_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_metrics_port() -> u16 {
    9100
}
