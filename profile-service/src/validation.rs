//! Profile field validation (`spec.md` §4.3).

use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;

use datecore::error::FieldError;
use datecore::models::{AllowMessagesFrom, Education, Gender, Goal, Orientation};

const MIN_AGE: i32 = 18;
const MAX_AGE: i32 = 120;

/// Request body for `POST /profiles` and `PATCH /profiles/{user_id}`.
///
/// `birth_date` and `gender` are accepted on every request but rejected
/// by [`check_immutable`] when present on a `PATCH` (`spec.md` §4.3).
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub orientation: String,
    pub goal: String,
    pub bio: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub height_cm: Option<i32>,
    pub education: Option<String>,
    pub has_children: Option<bool>,
    pub wants_children: Option<bool>,
    pub smoking: Option<bool>,
    pub drinking: Option<bool>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub hide_age: bool,
    #[serde(default)]
    pub hide_distance: bool,
    #[serde(default)]
    pub hide_online: bool,
    #[serde(default = "default_allow_messages_from")]
    pub allow_messages_from: String,
    #[serde(default = "default_true")]
    pub is_visible: bool,
}

fn default_allow_messages_from() -> String {
    "matches".to_string()
}

fn default_true() -> bool {
    true
}

/// Outcome of validating a [`ProfileRequest`] for creation.
pub struct ValidatedProfile {
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub orientation: Orientation,
    pub goal: Goal,
    pub bio: Option<String>,
    pub interests: Vec<String>,
    pub height_cm: Option<i32>,
    pub education: Option<Education>,
    pub has_children: Option<bool>,
    pub wants_children: Option<bool>,
    pub smoking: Option<bool>,
    pub drinking: Option<bool>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub hide_age: bool,
    pub hide_distance: bool,
    pub hide_online: bool,
    pub allow_messages_from: AllowMessagesFrom,
    pub is_visible: bool,
}

/// Age in whole years for a birth date as of today.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// Validate a creation request (`spec.md` §4.3: "required fields present for POST").
pub fn validate_create(req: &ProfileRequest) -> Result<ValidatedProfile, Vec<FieldError>> {
    let mut errors = Vec::new();

    if req.name.chars().count() < 2 || req.name.chars().count() > 100 {
        errors.push(FieldError::new("name", "must be 2-100 characters"));
    }

    let birth_date = req.birth_date;
    if birth_date.is_none() {
        errors.push(FieldError::new("birth_date", "is required"));
    }

    let today = Utc::now().date_naive();
    if let Some(bd) = birth_date {
        let age = age_on(bd, today);
        if age < MIN_AGE || age > MAX_AGE {
            errors.push(FieldError::new("birth_date", "age must be between 18 and 120"));
        }
    }

    let gender = match req.gender.as_deref() {
        Some(g) => match Gender::from_str(g) {
            Ok(g) => Some(g),
            Err(_) => {
                errors.push(FieldError::new("gender", "must be one of male, female, other"));
                None
            }
        },
        None => {
            errors.push(FieldError::new("gender", "is required"));
            None
        }
    };

    let orientation = match Orientation::from_str(&req.orientation) {
        Ok(o) => Some(o),
        Err(_) => {
            errors.push(FieldError::new("orientation", "must be one of male, female, any"));
            None
        }
    };

    let goal = match Goal::from_str(&req.goal) {
        Ok(g) => Some(g),
        Err(_) => {
            errors.push(FieldError::new("goal", "invalid goal"));
            None
        }
    };

    if let Some(bio) = &req.bio {
        if bio.chars().count() > 1000 {
            errors.push(FieldError::new("bio", "must be at most 1000 characters"));
        }
    }

    if req.interests.len() > 20 {
        errors.push(FieldError::new("interests", "at most 20 tags"));
    }
    for tag in &req.interests {
        if tag.chars().count() > 50 {
            errors.push(FieldError::new("interests", "each tag must be at most 50 characters"));
            break;
        }
    }

    if let Some(h) = req.height_cm {
        if !(100..=250).contains(&h) {
            errors.push(FieldError::new("height_cm", "must be between 100 and 250"));
        }
    }

    let education = match &req.education {
        Some(e) => match Education::from_str(e) {
            Ok(e) => Some(Some(e)),
            Err(_) => {
                errors.push(FieldError::new("education", "invalid education level"));
                None
            }
        },
        None => Some(None),
    };

    let allow_messages_from = match AllowMessagesFrom::from_str(&req.allow_messages_from) {
        Ok(a) => Some(a),
        Err(_) => {
            errors.push(FieldError::new(
                "allow_messages_from",
                "must be one of matches, anyone",
            ));
            None
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidatedProfile {
        name: req.name.clone(),
        birth_date: birth_date.expect("checked above"),
        gender: gender.expect("checked above"),
        orientation: orientation.expect("checked above"),
        goal: goal.expect("checked above"),
        bio: req.bio.clone(),
        interests: req.interests.clone(),
        height_cm: req.height_cm,
        education: education.expect("checked above"),
        has_children: req.has_children,
        wants_children: req.wants_children,
        smoking: req.smoking,
        drinking: req.drinking,
        country: req.country.clone(),
        city: req.city.clone(),
        lat: req.lat,
        lon: req.lon,
        hide_age: req.hide_age,
        hide_distance: req.hide_distance,
        hide_online: req.hide_online,
        allow_messages_from: allow_messages_from.expect("checked above"),
        is_visible: req.is_visible,
    })
}

/// `spec.md` §4.3: "On PATCH, immutable fields are birth_date, gender;
/// any attempt to change these yields 422."
pub fn check_immutable(req: &ProfileRequest) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if req.birth_date.is_some() {
        errors.push(FieldError::new("birth_date", "is immutable after creation"));
    }
    if req.gender.is_some() {
        errors.push(FieldError::new("gender", "is immutable after creation"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Whether all fields required for `is_complete` remain populated
/// (`spec.md` §3 invariant).
pub fn is_complete(validated: &ValidatedProfile) -> bool {
    let today = Utc::now().date_naive();
    age_on(validated.birth_date, today) >= MIN_AGE && !validated.name.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_on_handles_birthday_not_yet_reached() {
        let birth = NaiveDate::from_ymd_opt(2000, 12, 31).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(age_on(birth, today), 23);
    }

    #[test]
    fn age_on_handles_birthday_already_passed() {
        let birth = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(age_on(birth, today), 24);
    }
}
