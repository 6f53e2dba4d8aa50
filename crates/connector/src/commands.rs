//! Shortcut methods for the daemon's supported commands.
//!
//! One declared wrapper per command name, each delegating to
//! [`Connector::send_command`] without a reply callback. Callers that want
//! the reply register it through `send_command` or `subscribe` directly.

use crate::adapter::{Connector, Params};

impl Connector {
    /// Ask the daemon for its current peer list.
    pub fn peers(&self, params: Option<Params>) -> &Self {
        self.send_command("peers", params, None)
    }

    /// Fetch a store page.
    pub fn query_page(&self, params: Option<Params>) -> &Self {
        self.send_command("query_page", params, None)
    }

    /// Fetch a single order by id.
    pub fn query_order(&self, params: Option<Params>) -> &Self {
        self.send_command("query_order", params, None)
    }

    /// Fetch the order list.
    pub fn query_orders(&self, params: Option<Params>) -> &Self {
        self.send_command("query_orders", params, None)
    }

    /// Run a keyword search against the network.
    pub fn search(&self, params: Option<Params>) -> &Self {
        self.send_command("search", params, None)
    }

    /// Fetch pending notifications.
    pub fn get_notifications(&self, params: Option<Params>) -> &Self {
        self.send_command("get_notifications", params, None)
    }

    /// Poll the open-order count (replies arrive typed `order_count`).
    pub fn check_order_count(&self, params: Option<Params>) -> &Self {
        self.send_command("check_order_count", params, None)
    }

    /// Poll the unread-message count (replies arrive typed `inbox_count`).
    pub fn check_inbox_count(&self, params: Option<Params>) -> &Self {
        self.send_command("check_inbox_count", params, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::sync::mpsc;

    fn attached_connector() -> (Connector, mpsc::Receiver<String>) {
        let connector = Connector::new("localhost", 18444);
        let (tx, rx) = mpsc::channel(32);
        connector.test_connected(tx);
        (connector, rx)
    }

    fn sent_command(rx: &mut mpsc::Receiver<String>) -> String {
        let text = rx.try_recv().expect("expected a written frame");
        let value: Value = serde_json::from_str(&text).expect("frame must be JSON");
        value["command"].as_str().expect("command field").to_string()
    }

    #[test]
    fn test_each_shortcut_sends_its_command_name() {
        let (connector, mut rx) = attached_connector();

        connector
            .peers(None)
            .query_page(None)
            .query_order(None)
            .query_orders(None)
            .search(None)
            .get_notifications(None)
            .check_order_count(None)
            .check_inbox_count(None);

        for expected in [
            "peers",
            "query_page",
            "query_order",
            "query_orders",
            "search",
            "get_notifications",
            "check_order_count",
            "check_inbox_count",
        ] {
            assert_eq!(sent_command(&mut rx), expected);
        }
    }

    #[test]
    fn test_shortcuts_are_fire_and_forget() {
        let (connector, mut rx) = attached_connector();

        connector.check_order_count(None);
        let _ = sent_command(&mut rx);

        // No one-shot callback was registered for the reply.
        connector.test_dispatch_frame(r#"{"result":{"type":"order_count","count":0}}"#);
        assert!(!connector.test_has_one_shot("order_count"));
    }
}
