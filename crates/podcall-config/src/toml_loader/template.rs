//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Podcall Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.
# PUSHER_APP_ID / PUSHER_KEY / PUSHER_SECRET / PUSHER_CLUSTER override [pusher].

[pusher]
# app_id = ""
# key = ""
# secret = ""             # relay only, prefer the PUSHER_SECRET variable
# cluster = "mt1"
# ws_host = "127.0.0.1:6001"   # self-hosted, protocol-compatible server
# api_host = "127.0.0.1:6001"
# use_tls = true

[presence]
# channel = "presence-audio"   # must start with "presence-"
# activity_timeout_secs = 120  # 10-600
# connect_timeout_secs = 15    # 1-120
# reconnect_delay_secs = 1     # 1-60
# max_reconnect_delay_secs = 30

[relay]
# bind = "127.0.0.1:3000"
# session_endpoint = "https://app.example/api/auth/session"
#
# [[relay.sessions]]
# token = "dev-token"
# user_id = "host-1"
# name = "Host"

[client]
# relay_url = "http://127.0.0.1:3000"
# session_token = "dev-token"  # leave unset to join as a guest
# negotiation_timeout_secs = 30  # 0 disables, max 600
# ice_servers = ["stun:stun.l.google.com:19302"]

[logging]
# level = "info"               # trace, debug, info, warn, error
"##
    .to_string()
}
