//! Fixed-choice slash-command parameters.
//!
//! Discord shows these as drop-downs; each maps onto the matching core type.

use crate::core::{
    incident::{Charge, DamageTier},
    model::{Condition, Holder, IssueType, PaymentMode, Religion},
};

/// Kind of holder a copy is given to
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum HolderChoice {
    /// A student
    #[name = "student"]
    Student,
    /// A teacher
    #[name = "teacher"]
    Teacher,
    /// Book storage
    #[name = "storage"]
    Storage,
}

impl HolderChoice {
    /// Combines the kind with the typed id. Storage ignores the id.
    #[must_use]
    pub fn with_id(self, id: Option<String>) -> Option<Holder> {
        match self {
            Self::Storage => Some(Holder::Storage),
            Self::Student => id.map(Holder::Student),
            Self::Teacher => id.map(Holder::Teacher),
        }
    }
}

/// Physical condition of a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum ConditionChoice {
    /// Like new
    #[name = "ok"]
    Ok,
    /// Visibly used
    #[name = "used"]
    Used,
    /// Damaged
    #[name = "damaged"]
    Damaged,
}

impl From<ConditionChoice> for Condition {
    fn from(choice: ConditionChoice) -> Self {
        match choice {
            ConditionChoice::Ok => Self::Ok,
            ConditionChoice::Used => Self::Used,
            ConditionChoice::Damaged => Self::Damaged,
        }
    }
}

/// Kind of incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum IssueChoice {
    /// Lost
    #[name = "lost"]
    Lost,
    /// Damaged
    #[name = "damaged"]
    Damaged,
    /// Not returned
    #[name = "missing"]
    Missing,
}

impl From<IssueChoice> for IssueType {
    fn from(choice: IssueChoice) -> Self {
        match choice {
            IssueChoice::Lost => Self::Lost,
            IssueChoice::Damaged => Self::Damaged,
            IssueChoice::Missing => Self::Missing,
        }
    }
}

/// How an incident is charged
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum ChargeChoice {
    /// Title price
    #[name = "full replacement"]
    Full,
    /// Configured minor damage fee
    #[name = "minor damage"]
    Minor,
    /// Configured major damage fee
    #[name = "major damage"]
    Major,
    /// Amount given in `custom_amount`
    #[name = "custom"]
    Custom,
    /// No charge
    #[name = "waived"]
    Waived,
}

impl ChargeChoice {
    /// Builds the core charge; `Custom` needs an amount.
    #[must_use]
    pub fn into_charge(self, custom_amount: Option<f64>) -> Option<Charge> {
        match self {
            Self::Full => Some(Charge::FullReplacement),
            Self::Minor => Some(Charge::Tier(DamageTier::Minor)),
            Self::Major => Some(Charge::Tier(DamageTier::Major)),
            Self::Custom => custom_amount.map(Charge::Custom),
            Self::Waived => Some(Charge::Waived),
        }
    }
}

/// Payment mode of an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum PaymentChoice {
    /// Cash
    #[name = "cash"]
    Cash,
    /// Transfer or invoice
    #[name = "transfer"]
    Transfer,
    /// Not yet known
    #[name = "unknown"]
    Unknown,
}

impl From<PaymentChoice> for PaymentMode {
    fn from(choice: PaymentChoice) -> Self {
        match choice {
            PaymentChoice::Cash => Self::Cash,
            PaymentChoice::Transfer => Self::Transfer,
            PaymentChoice::Unknown => Self::Unknown,
        }
    }
}

/// Religion class
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum ReligionChoice {
    /// Protestant
    #[name = "EV"]
    Ev,
    /// Catholic
    #[name = "RK"]
    Rk,
    /// Ethics
    #[name = "PP"]
    Pp,
}

impl From<ReligionChoice> for Religion {
    fn from(choice: ReligionChoice) -> Self {
        match choice {
            ReligionChoice::Ev => Self::Ev,
            ReligionChoice::Rk => Self::Rk,
            ReligionChoice::Pp => Self::Pp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holder_choice_needs_id() {
        assert_eq!(HolderChoice::Storage.with_id(None), Some(Holder::Storage));
        assert_eq!(
            HolderChoice::Student.with_id(Some("S1".to_string())),
            Some(Holder::Student("S1".to_string()))
        );
        assert_eq!(HolderChoice::Teacher.with_id(None), None);
    }

    #[test]
    fn test_custom_charge_needs_amount() {
        assert_eq!(ChargeChoice::Custom.into_charge(None), None);
        assert_eq!(
            ChargeChoice::Custom.into_charge(Some(3.5)),
            Some(Charge::Custom(3.5))
        );
        assert_eq!(ChargeChoice::Waived.into_charge(Some(3.5)), Some(Charge::Waived));
    }
}
