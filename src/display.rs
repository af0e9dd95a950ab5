use crate::participant::{find, Participant};

/// Formats a participant as `Name <email>`
pub fn format_participant(p: &Participant) -> String {
    format!("{} <{}>", p.name, p.email)
}

/// One `giver → recipient` line per participant, in roster order
pub fn describe_assignment(roster: &[Participant]) -> Vec<String> {
    roster
        .iter()
        .map(|giver| {
            let recipient = giver
                .assigned_to
                .as_ref()
                .map(|id| find(roster, id).map_or_else(|| format!("[unknown {}]", id), |r| r.name.clone()))
                .unwrap_or_else(|| "[not assigned]".to_string());
            format!("🎁 {} → {}", giver.name, recipient)
        })
        .collect()
}

/// Prints the roster in a readable format
pub fn print_roster(roster: &[Participant]) {
    println!("\n=== Participants ({}) ===", roster.len());
    for p in roster {
        println!(
            "  {} (ID: {}, registered {})",
            format_participant(p),
            p.id,
            p.registered_at.format("%Y-%m-%d %H:%M")
        );
        println!("      wishes: {}", p.wishes_or_placeholder());
    }
}

/// Prints who gives to whom
pub fn print_assignment(roster: &[Participant]) {
    println!("\n=== Assignments ===");
    for line in describe_assignment(roster) {
        println!("  {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::{sample, ParticipantId};

    #[test]
    fn describes_each_giver_in_order() {
        let mut alice = sample("a", "Alice");
        let mut bob = sample("b", "Bob");
        let carol = sample("c", "Carol");
        alice.assigned_to = Some(ParticipantId::from("b"));
        bob.assigned_to = Some(ParticipantId::from("gone"));

        let lines = describe_assignment(&[alice, bob, carol]);
        assert_eq!(lines[0], "🎁 Alice → Bob");
        assert_eq!(lines[1], "🎁 Bob → [unknown gone]");
        assert_eq!(lines[2], "🎁 Carol → [not assigned]");
    }

    #[test]
    fn formats_name_and_email() {
        assert_eq!(format_participant(&sample("a", "Alice")), "Alice <alice@example.com>");
    }
}
