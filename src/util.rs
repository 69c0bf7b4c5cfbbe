use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch.
pub fn create_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since_the_epoch| since_the_epoch.as_millis() as u64)
        .unwrap_or_default()
}

pub fn format_host_string(host: [u8; 4], port: u16) -> String {
    let host_string = host
        .iter()
        .map(|int| int.to_string())
        .collect::<Vec<String>>()
        .join(".");
    format!("{}:{}", host_string, port)
}

/// Websocket url a peer uses to open a socket as `peer_id`.
pub fn format_peer_socket_url(host: [u8; 4], port: u16, peer_id: &str) -> String {
    format!("ws://{}/wsopen/{}", format_host_string(host, port), peer_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_host_string_test() {
        assert_eq!(format_host_string([127, 0, 0, 1], 5020), "127.0.0.1:5020");
    }

    #[test]
    fn format_peer_socket_url_test() {
        assert_eq!(
            format_peer_socket_url([10, 0, 0, 7], 80, "QmClient"),
            "ws://10.0.0.7:80/wsopen/QmClient"
        );
    }
}
