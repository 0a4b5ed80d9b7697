use pgdrift_lib_core::change::{Change, ChangeDetails, ChangeKind, ObjectKind, Severity};
use pgdrift_lib_core::model::Sequence;

use crate::comparators::{by_key, CompareContext};

fn render(sequence: &Sequence) -> String {
    format!(
        "increment={} min={} max={} cycle={}",
        sequence.increment,
        sequence.min_value.map_or("none".to_owned(), |v| v.to_string()),
        sequence.max_value.map_or("none".to_owned(), |v| v.to_string()),
        sequence.cycle
    )
}

fn same_sequence(a: &Sequence, b: &Sequence) -> bool {
    a.increment == b.increment
        && a.min_value == b.min_value
        && a.max_value == b.max_value
        && a.cycle == b.cycle
}

pub(crate) fn compare(ctx: &mut CompareContext) {
    let current = by_key(&ctx.current.sequences, Sequence::qualified_name);
    let desired = by_key(&ctx.desired.sequences, Sequence::qualified_name);

    for (name, sequence) in &desired {
        match current.get(name) {
            None => ctx.push(Change::new(
                ChangeKind::AddSequence,
                Severity::Safe,
                ObjectKind::Sequence,
                name,
                format!("add sequence {name}"),
            )),
            Some(existing) if !same_sequence(existing, sequence) => {
                let mut change = Change::new(
                    ChangeKind::ModifySequence,
                    Severity::Safe,
                    ObjectKind::Sequence,
                    name,
                    format!("modify sequence {name}"),
                );
                change.details = ChangeDetails::Definition {
                    current: render(existing),
                    desired: render(sequence),
                };
                ctx.push(change);
            }
            Some(_) => {}
        }
    }
    for (name, sequence) in &current {
        if !desired.contains_key(name) {
            // An owned sequence disappears with its table; a free-standing
            // one takes data with it.
            let severity = if sequence.owned_by.trim().is_empty() {
                Severity::Breaking
            } else {
                Severity::PotentiallyBreaking
            };
            ctx.push(Change::new(
                ChangeKind::DropSequence,
                severity,
                ObjectKind::Sequence,
                name,
                format!("drop sequence {name}"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modify_triggers_on_increment_bounds_and_cycle_only() {
        let base = Sequence {
            schema: "public".into(),
            name: "s".into(),
            increment: 1,
            min_value: Some(1),
            max_value: None,
            start: Some(1),
            cycle: false,
            owned_by: String::new(),
        };
        assert!(same_sequence(&base, &Sequence { start: Some(100), ..base.clone() }));
        assert!(!same_sequence(&base, &Sequence { increment: 2, ..base.clone() }));
        assert!(!same_sequence(&base, &Sequence { cycle: true, ..base.clone() }));
        assert!(!same_sequence(&base, &Sequence { max_value: Some(10), ..base.clone() }));
    }
}
