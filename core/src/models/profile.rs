use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 1:1 with [`crate::models::User`] (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Owning user's id; also this profile's primary key.
    pub user_id: i64,
    /// Display name, 2-100 chars.
    pub name: String,
    /// Date of birth; age must stay >= 18 at all times.
    pub birth_date: NaiveDate,
    /// Self-identified gender.
    pub gender: Gender,
    /// Which gender(s) this user wants to see.
    pub orientation: Orientation,
    /// What the user is looking for.
    pub goal: Goal,
    /// Free text, <= 1000 chars.
    pub bio: Option<String>,
    /// Up to 20 tags, each <= 50 chars.
    pub interests: Vec<String>,
    /// 100-250.
    pub height_cm: Option<i32>,
    /// Highest completed education level.
    pub education: Option<Education>,
    pub has_children: Option<bool>,
    pub wants_children: Option<bool>,
    pub smoking: Option<bool>,
    pub drinking: Option<bool>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Derived from `lat`/`lon` at ~5 km precision.
    pub geohash: Option<String>,
    pub hide_age: bool,
    pub hide_distance: bool,
    pub hide_online: bool,
    /// Who may open a conversation with this user absent a match.
    pub allow_messages_from: AllowMessagesFrom,
    pub is_visible: bool,
    /// `true` iff all required fields are present and age >= 18.
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Age in whole years as of `today`.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        use chrono::Datelike;
        let mut age = today.year() - self.birth_date.year();
        let had_birthday_this_year =
            (today.month(), today.day()) >= (self.birth_date.month(), self.birth_date.day());
        if !had_birthday_this_year {
            age -= 1;
        }
        age
    }
}

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
        #[serde(rename_all = "snake_case")]
        #[sqlx(type_name = "text", rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $($name::$variant => $s),+
                };
                f.write_str(s)
            }
        }

        impl FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($name::$variant)),+,
                    other => Err(format!("invalid {}: {other}", stringify!($name))),
                }
            }
        }
    };
}

string_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

string_enum!(Orientation {
    Male => "male",
    Female => "female",
    Any => "any",
});

string_enum!(Goal {
    Friendship => "friendship",
    Dating => "dating",
    Relationship => "relationship",
    Networking => "networking",
    Serious => "serious",
    Casual => "casual",
});

string_enum!(Education {
    HighSchool => "high_school",
    Bachelor => "bachelor",
    Master => "master",
    Phd => "phd",
    Other => "other",
});

string_enum!(AllowMessagesFrom {
    Matches => "matches",
    Anyone => "anyone",
});

impl Education {
    /// Ordinal tier used by discovery's education-proximity score
    /// (`spec.md` §4.4 step 5). `Other` sits at the bottom, matching no
    /// particular tier.
    pub fn tier(self) -> u8 {
        match self {
            Education::Other => 0,
            Education::HighSchool => 1,
            Education::Bachelor => 2,
            Education::Master => 3,
            Education::Phd => 4,
        }
    }

    /// Highest tier value, for normalizing proximity to `[0, 1]`.
    pub const MAX_TIER: u8 = 4;
}

impl Orientation {
    /// Expand `any` to the concrete gender set it matches.
    pub fn matches(self, gender: Gender) -> bool {
        match self {
            Orientation::Any => true,
            Orientation::Male => gender == Gender::Male,
            Orientation::Female => gender == Gender::Female,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_round_trips_through_string() {
        assert_eq!(Gender::from_str("male").unwrap(), Gender::Male);
        assert_eq!(Gender::Male.to_string(), "male");
        assert!(Gender::from_str("robot").is_err());
    }

    #[test]
    fn orientation_any_matches_everyone() {
        assert!(Orientation::Any.matches(Gender::Other));
        assert!(!Orientation::Male.matches(Gender::Female));
    }

    #[test]
    fn education_tiers_are_ordered() {
        assert!(Education::Phd.tier() > Education::Bachelor.tier());
        assert!(Education::Bachelor.tier() > Education::HighSchool.tier());
    }
}
