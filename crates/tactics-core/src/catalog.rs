//! Static race and class tables.
//!
//! Units only carry their race and class names; stats and abilities are
//! looked up here on both ends of the wire. Any change to these tables must
//! bump [`CATALOG_VERSION`] so that peers running different data refuse each
//! other's snapshots instead of silently disagreeing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of the data in this module, sent with every full snapshot
pub const CATALOG_VERSION: u32 = 1;

/// Declared range of melee abilities; the engine always treats melee as range 1
pub const MELEE_RANGE: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CatalogError {
    #[error("Unknown race: {0}")]
    UnknownRace(String),

    #[error("Unknown class: {0}")]
    UnknownClass(String),
}

/// Base stats of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub strength: u32,
    pub intellect: u32,
    pub dexterity: u32,
    pub max_health: u32,
    pub max_mana: u32,
    /// Steps per turn
    pub speed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbilityKind {
    Melee,
    Ranged,
    /// Always on; cannot be used as an action
    Passive,
    Active,
}

/// What an ability may be aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetMode {
    /// The caster's own cell
    SelfOnly,
    /// An open, walkable cell
    Tile,
    /// Any occupied cell
    Unit,
    /// A cell holding a unit of the caster's seat
    Ally,
    /// A cell holding a unit of any other seat, or an unbound unit
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModifierKind {
    ExtraDamage,
    DodgeChance,
    HitChance,
    RateOfFire,
    TeamBuff,
    CounterChance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Modifier {
    pub kind: ModifierKind,
    pub amount: i32,
}

/// What an ability does once it lands.
///
/// Damage and heal amounts are formula strings such as `"st+5*r"`. They are
/// stored verbatim; see [`crate::effect`] for how they are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Damage { formula: &'static str },
    Heal { formula: &'static str },
    Buff { modifiers: &'static [Modifier] },
    Debuff { modifiers: &'static [Modifier] },
    /// Move the caster to the target cell. `uses` is declared data only;
    /// nothing limits how often the ability fires beyond once per turn.
    Teleport { uses: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ability {
    pub name: &'static str,
    pub kind: AbilityKind,
    pub target: TargetMode,
    pub range: u32,
    /// Trigger chance in percent, for abilities that fire randomly
    pub chance: Option<u32>,
    pub effect: Effect,
}

impl Ability {
    /// Range used for targeting: melee is always adjacent
    pub fn effective_range(&self) -> u32 {
        match self.kind {
            AbilityKind::Melee => MELEE_RANGE,
            _ => self.range,
        }
    }

    pub fn is_passive(&self) -> bool {
        self.kind == AbilityKind::Passive
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct RaceDef {
    pub name: &'static str,
    pub stats: Stats,
    pub abilities: &'static [Ability],
}

#[derive(Debug, PartialEq, Eq)]
pub struct ClassDef {
    pub name: &'static str,
    pub abilities: &'static [Ability],
}

const fn passive(name: &'static str, effect: Effect) -> Ability {
    Ability {
        name,
        kind: AbilityKind::Passive,
        target: TargetMode::SelfOnly,
        range: 0,
        chance: None,
        effect,
    }
}

pub static RACES: &[RaceDef] = &[
    RaceDef {
        name: "dwarf",
        stats: Stats {
            strength: 7,
            intellect: 3,
            dexterity: 2,
            max_health: 20,
            max_mana: 5,
            speed: 5,
        },
        abilities: &[
            passive(
                "thickSkin",
                Effect::Buff {
                    modifiers: &[Modifier {
                        kind: ModifierKind::ExtraDamage,
                        amount: 10,
                    }],
                },
            ),
            passive(
                "slow",
                Effect::Debuff {
                    modifiers: &[Modifier {
                        kind: ModifierKind::DodgeChance,
                        amount: -10,
                    }],
                },
            ),
        ],
    },
    RaceDef {
        name: "elf",
        stats: Stats {
            strength: 5,
            intellect: 7,
            dexterity: 10,
            max_health: 10,
            max_mana: 10,
            speed: 7,
        },
        abilities: &[
            passive(
                "keenEyes",
                Effect::Buff {
                    modifiers: &[Modifier {
                        kind: ModifierKind::HitChance,
                        amount: 10,
                    }],
                },
            ),
            Ability {
                chance: Some(5),
                ..passive(
                    "tangle",
                    Effect::Debuff {
                        modifiers: &[
                            Modifier {
                                kind: ModifierKind::RateOfFire,
                                amount: -25,
                            },
                            Modifier {
                                kind: ModifierKind::ExtraDamage,
                                amount: 10,
                            },
                        ],
                    },
                )
            },
        ],
    },
    RaceDef {
        name: "gnome",
        stats: Stats {
            strength: 4,
            intellect: 10,
            dexterity: 4,
            max_health: 10,
            max_mana: 15,
            speed: 6,
        },
        abilities: &[
            passive(
                "short",
                Effect::Buff {
                    modifiers: &[Modifier {
                        kind: ModifierKind::DodgeChance,
                        amount: 10,
                    }],
                },
            ),
            passive(
                "short",
                Effect::Debuff {
                    modifiers: &[Modifier {
                        kind: ModifierKind::ExtraDamage,
                        amount: 4,
                    }],
                },
            ),
        ],
    },
    RaceDef {
        name: "human",
        stats: Stats {
            strength: 6,
            intellect: 7,
            dexterity: 6,
            max_health: 15,
            max_mana: 7,
            speed: 6,
        },
        abilities: &[
            passive(
                "adaptable",
                Effect::Buff {
                    modifiers: &[
                        Modifier {
                            kind: ModifierKind::DodgeChance,
                            amount: 10,
                        },
                        Modifier {
                            kind: ModifierKind::HitChance,
                            amount: 5,
                        },
                    ],
                },
            ),
            passive(
                "egotistic",
                Effect::Debuff {
                    modifiers: &[Modifier {
                        kind: ModifierKind::TeamBuff,
                        amount: -15,
                    }],
                },
            ),
        ],
    },
    RaceDef {
        name: "goblin",
        stats: Stats {
            strength: 7,
            intellect: 2,
            dexterity: 10,
            max_health: 12,
            max_mana: 0,
            speed: 5,
        },
        abilities: &[
            passive(
                "nimble",
                Effect::Debuff {
                    modifiers: &[Modifier {
                        kind: ModifierKind::CounterChance,
                        amount: 15,
                    }],
                },
            ),
            Ability {
                name: "charge",
                kind: AbilityKind::Active,
                target: TargetMode::Tile,
                range: 3,
                chance: None,
                effect: Effect::Teleport { uses: 1 },
            },
        ],
    },
];

pub static CLASSES: &[ClassDef] = &[ClassDef {
    name: "wizard",
    abilities: &[
        Ability {
            name: "Poke",
            kind: AbilityKind::Melee,
            target: TargetMode::Enemy,
            range: MELEE_RANGE,
            chance: None,
            effect: Effect::Damage { formula: "st+5*r" },
        },
        Ability {
            name: "Fireball",
            kind: AbilityKind::Ranged,
            target: TargetMode::Enemy,
            range: 10,
            chance: None,
            effect: Effect::Damage { formula: "iq+5*r" },
        },
        Ability {
            name: "Heal",
            kind: AbilityKind::Melee,
            target: TargetMode::Ally,
            range: MELEE_RANGE,
            chance: None,
            effect: Effect::Heal {
                formula: "iq/2+3*r",
            },
        },
    ],
}];

/// Look up a race by its lowercase name
pub fn race(name: &str) -> Result<&'static RaceDef, CatalogError> {
    RACES
        .iter()
        .find(|r| r.name == name)
        .ok_or_else(|| CatalogError::UnknownRace(name.to_string()))
}

/// Look up a class by its lowercase name
pub fn class(name: &str) -> Result<&'static ClassDef, CatalogError> {
    CLASSES
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| CatalogError::UnknownClass(name.to_string()))
}
