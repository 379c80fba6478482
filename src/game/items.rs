//! # Item Behaviors
//!
//! One variant per consumable or prop effect. Each variant's actual
//! resolution lives in the turn engine, which owns the world access the
//! effects need; this module keeps the data and the story text table.

/// The item-behavior capability, one variant per effect.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemEffect {
    /// Plain pickable with no effect beyond consuming itself.
    Generic,
    /// Restores a fixed amount of HP, capped at max.
    Healer { amount: f32 },
    /// Wraps a targeted actor's AI in confusion for a fixed turn count.
    Confuser { turns: i32, range: f32 },
    /// Single-target ranged shot resolved against exactly the picked tile.
    Gun { range: f32, damage: f32 },
    /// Damages every living actor within the radius of the picked tile.
    Grenade { radius: f32, damage: f32 },
    /// One revolver round for the cylinder.
    Ammo,
    /// One-shot narrative text keyed by level and index, fired on step-in.
    Story { level: usize, index: u8, used: bool },
    /// Ends the game in victory.
    Win,
    /// One-shot: opens and becomes permanently passable.
    Door { open: bool },
}

impl ItemEffect {
    /// True for effects the player can carry in the inventory. Doors and
    /// memos are fixtures of the level.
    pub fn is_portable(&self) -> bool {
        !matches!(self, ItemEffect::Story { .. } | ItemEffect::Door { .. })
    }
}

/// Narrative text for a story trigger, keyed by level index and memo index.
pub fn story_text(level: usize, index: u8) -> Option<&'static str> {
    match (level, index) {
        (0, 1) => Some(
            "The office is colder than the street outside. Marlow's desk is \
             still covered in case files nobody will ever close. On top of \
             the pile, a note in her handwriting: they took the girl below \
             the old subway line. Don't trust the blue coats.",
        ),
        (0, 2) => Some(
            "A torn ledger page. Half the entries are payoffs to someone \
             called the Collector. The other half are crossed out in red.",
        ),
        (1, 1) => Some(
            "Chalk marks on the wall count days, or bodies. Someone stopped \
             counting at thirty-one.",
        ),
        (1, 2) => Some(
            "A gangster's jacket hangs off a chair, pockets turned out. \
             Whatever they were paid, they left in a hurry to spend it.",
        ),
        (4, 1) => Some(
            "The last door. Behind it, breathing. You check the cylinder \
             one more time and stop thinking about the way back up.",
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_props_are_not_portable() {
        assert!(!ItemEffect::Door { open: false }.is_portable());
        assert!(!ItemEffect::Story {
            level: 0,
            index: 1,
            used: false
        }
        .is_portable());
    }

    #[test]
    fn test_consumables_are_portable() {
        assert!(ItemEffect::Generic.is_portable());
        assert!(ItemEffect::Healer { amount: 4.0 }.is_portable());
        assert!(ItemEffect::Ammo.is_portable());
        assert!(ItemEffect::Win.is_portable());
    }

    #[test]
    fn test_story_table_is_keyed_by_level_and_index() {
        assert!(story_text(0, 1).is_some());
        assert!(story_text(1, 2).is_some());
        assert!(story_text(2, 1).is_none());
        assert!(story_text(0, 9).is_none());
    }
}
