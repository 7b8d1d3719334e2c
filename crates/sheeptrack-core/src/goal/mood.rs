use serde::{Deserialize, Serialize};

/// How the sheep is doing, derived from the heart count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetMood {
    Happy,
    Annoyed,
    Sick,
    Dead,
}

impl PetMood {
    pub fn from_hearts(hearts: u8) -> Self {
        match hearts {
            0 => PetMood::Dead,
            1 => PetMood::Sick,
            2 => PetMood::Annoyed,
            _ => PetMood::Happy,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PetMood::Happy => "happy",
            PetMood::Annoyed => "annoyed",
            PetMood::Sick => "sick",
            PetMood::Dead => "dead",
        }
    }
}
