#[cfg(test)]
mod tests {
    use crate::cluster::types::{Membership, NodeId};

    fn node(name: &str) -> NodeId {
        NodeId(format!("127.0.0.1:{}", name))
    }

    #[test]
    fn test_solo_membership() {
        let m = Membership::solo(node("5000"));
        assert_eq!(m.primaries.len(), 1);
        assert!(m.replicas.is_empty());
        assert_eq!(m.w, 1);
    }

    #[test]
    fn test_all_members_appends_replicas() {
        let m = Membership {
            primaries: vec![node("1"), node("2")],
            replicas: vec![node("3")],
            w: 2,
        };

        let members = m.all_members();
        assert_eq!(members, vec![node("1"), node("2"), node("3")]);
    }

    #[test]
    fn test_all_members_deduplicates() {
        // A node listed as both primary and replica must only be
        // broadcast to once in phase 2.
        let m = Membership {
            primaries: vec![node("1"), node("2")],
            replicas: vec![node("2"), node("3")],
            w: 2,
        };

        let members = m.all_members();
        assert_eq!(members.len(), 3);
        assert_eq!(members, vec![node("1"), node("2"), node("3")]);
    }

    #[test]
    fn test_node_id_round_trips_through_json() {
        let id = node("4242");
        let encoded = serde_json::to_string(&id).unwrap();
        let decoded: NodeId = serde_json::from_str(&encoded).unwrap();
        assert_eq!(id, decoded);
    }
}
