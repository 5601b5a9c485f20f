pub mod channel;

use crate::utilities::configuration::NetworkParams;

/// Joins prefix, host and port into a ZeroMQ endpoint, e.g. `tcp://*:5555`.
pub fn construct_address(network_params: &NetworkParams) -> String {
    network_params.prefix.clone() + &network_params.host + ":" + &network_params.port
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_from_params() {
        let params = NetworkParams::new("tcp://", "*", "5555");
        assert_eq!(construct_address(&params), "tcp://*:5555");

        let params = NetworkParams::new("tcp://", "127.0.0.1", "*");
        assert_eq!(construct_address(&params), "tcp://127.0.0.1:*");
    }
}
