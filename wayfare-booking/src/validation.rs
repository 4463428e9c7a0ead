//! Request validation for booking creation and passenger edits.
//!
//! Runs before anything is written. Every broken rule is collected so the caller gets the
//! full list in one response.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use uuid::Uuid;
use wayfare_catalog::AddOnSelection;
use wayfare_core::booking::{ContactInfo, PassengerType, PassengerUpdate};
use wayfare_core::flight::CabinClass;
use wayfare_core::{CoreError, CoreResult, FieldError};
use wayfare_shared::Masked;

use crate::request::{ContactInput, CreateBookingRequest, PassengerInput};

const MIN_PHONE_DIGITS: usize = 8;
const INFANT_MAX_AGE: i32 = 1;
const CHILD_AGES: std::ops::RangeInclusive<i32> = 2..=11;
/// Upper bound on units of one add-on per leg, summed over repeated entries.
pub const MAX_ADDON_QUANTITY: i32 = 10;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeatMode {
    Auto,
    Manual,
}

#[derive(Debug, Clone)]
pub struct ValidPassenger {
    pub first_name: String,
    pub last_name: String,
    pub passenger_type: PassengerType,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub citizen_id: Option<Masked<String>>,
    pub passport_number: Option<Masked<String>>,
    pub travel_class: Option<CabinClass>,
    /// One seat number per leg in manual mode, empty otherwise.
    pub seat_numbers: Vec<String>,
}

impl ValidPassenger {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct ValidLeg {
    pub flight_id: Uuid,
    pub class_type: Option<CabinClass>,
    pub service_package_id: Option<Uuid>,
    pub baggage: Vec<AddOnSelection>,
    pub meals: Vec<AddOnSelection>,
}

/// A booking request that passed every structural rule.
#[derive(Debug, Clone)]
pub struct ValidBooking {
    pub contact: ContactInfo,
    pub passengers: Vec<ValidPassenger>,
    pub legs: Vec<ValidLeg>,
    pub class_type: Option<CabinClass>,
    pub promotion_code: Option<String>,
    pub seat_mode: SeatMode,
}

impl ValidBooking {
    /// Passenger class, then leg class, then request class, then economy.
    pub fn cabin_for(&self, passenger: &ValidPassenger, leg: &ValidLeg) -> CabinClass {
        passenger
            .travel_class
            .or(leg.class_type)
            .or(self.class_type)
            .unwrap_or_default()
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn present(value: &Option<Masked<String>>) -> bool {
    value.as_ref().is_some_and(|v| !blank(v.expose()))
}

fn parse_class(raw: Option<&str>, field: String, errors: &mut Vec<FieldError>) -> Option<CabinClass> {
    let raw = raw?;
    match raw.parse::<CabinClass>() {
        Ok(class) => Some(class),
        Err(_) => {
            errors.push(FieldError::new(field, format!("Invalid travel class '{}'", raw.trim())));
            None
        }
    }
}

fn validate_contact(contact: Option<&ContactInput>, errors: &mut Vec<FieldError>) -> ContactInfo {
    let Some(c) = contact else {
        errors.push(FieldError::new("contact_info", "contact_info is required"));
        return ContactInfo {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
        };
    };

    if blank(&c.first_name) {
        errors.push(FieldError::new("contact_info.first_name", "first_name is required"));
    }
    if blank(&c.last_name) {
        errors.push(FieldError::new("contact_info.last_name", "last_name is required"));
    }
    let email = c.email.trim();
    let email_ok = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty())
        && !email.contains(char::is_whitespace);
    if !email_ok {
        errors.push(FieldError::new("contact_info.email", "A valid email is required"));
    }
    if c.phone.chars().filter(char::is_ascii_digit).count() < MIN_PHONE_DIGITS {
        errors.push(FieldError::new(
            "contact_info.phone",
            format!("Phone must contain at least {} digits", MIN_PHONE_DIGITS),
        ));
    }

    ContactInfo {
        first_name: c.first_name.trim().to_string(),
        last_name: c.last_name.trim().to_string(),
        email: email.to_ascii_lowercase(),
        phone: c.phone.trim().to_string(),
    }
}

/// Non-positive quantities are skipped later at pricing time; only the upper bound is checked here.
fn check_add_ons(field: &str, selections: &[AddOnSelection], errors: &mut Vec<FieldError>) {
    let mut totals: Vec<(Uuid, i64)> = Vec::new();
    for s in selections.iter().filter(|s| s.quantity > 0) {
        match totals.iter_mut().find(|(id, _)| *id == s.service_id) {
            Some((_, total)) => *total += i64::from(s.quantity),
            None => totals.push((s.service_id, i64::from(s.quantity))),
        }
    }
    for (service_id, total) in totals {
        if total > i64::from(MAX_ADDON_QUANTITY) {
            errors.push(FieldError::new(
                field,
                format!(
                    "At most {} units of add-on {} may be selected per flight",
                    MAX_ADDON_QUANTITY, service_id
                ),
            ));
        }
    }
}

fn validate_legs(
    req: &CreateBookingRequest,
    class_type: Option<CabinClass>,
    errors: &mut Vec<FieldError>,
) -> Vec<ValidLeg> {
    match (req.flight_id, req.itinerary.is_empty()) {
        (Some(_), false) => {
            errors.push(FieldError::new("flight_id", "Provide either flight_id or itinerary, not both"));
            Vec::new()
        }
        (None, true) => {
            errors.push(FieldError::new("flight_id", "flight_id or itinerary is required"));
            Vec::new()
        }
        (Some(flight_id), true) => {
            check_add_ons("baggage_options", &req.baggage_options, errors);
            check_add_ons("meal_options", &req.meal_options, errors);
            vec![ValidLeg {
                flight_id,
                class_type,
                service_package_id: req.service_package_id,
                baggage: req.baggage_options.clone(),
                meals: req.meal_options.clone(),
            }]
        }
        (None, false) => {
            if !req.baggage_options.is_empty() || !req.meal_options.is_empty() {
                errors.push(FieldError::new(
                    "baggage_options",
                    "Add-ons must be given per itinerary leg",
                ));
            }
            let mut seen = HashSet::new();
            let mut legs = Vec::with_capacity(req.itinerary.len());
            for (i, leg) in req.itinerary.iter().enumerate() {
                if !seen.insert(leg.flight_id) {
                    errors.push(FieldError::new(
                        format!("itinerary[{}].flight_id", i),
                        "The same flight appears more than once",
                    ));
                }
                check_add_ons(&format!("itinerary[{}].baggage_options", i), &leg.baggage_options, errors);
                check_add_ons(&format!("itinerary[{}].meal_options", i), &leg.meal_options, errors);
                legs.push(ValidLeg {
                    flight_id: leg.flight_id,
                    class_type: parse_class(
                        leg.class_type.as_deref(),
                        format!("itinerary[{}].class_type", i),
                        errors,
                    ),
                    service_package_id: leg.service_package_id.or(req.service_package_id),
                    baggage: leg.baggage_options.clone(),
                    meals: leg.meal_options.clone(),
                });
            }
            legs
        }
    }
}

fn validate_passenger(
    i: usize,
    p: &PassengerInput,
    leg_count: usize,
    errors: &mut Vec<FieldError>,
) -> Option<ValidPassenger> {
    let field = |name: &str| format!("passengers[{}].{}", i, name);
    let before = errors.len();

    if blank(&p.first_name) {
        errors.push(FieldError::new(field("first_name"), "first_name is required"));
    }
    if blank(&p.last_name) {
        errors.push(FieldError::new(field("last_name"), "last_name is required"));
    }

    let passenger_type = match p.passenger_type.as_deref() {
        None => {
            errors.push(FieldError::new(field("passenger_type"), "passenger_type is required"));
            None
        }
        Some(raw) => match raw.parse::<PassengerType>() {
            Ok(t) => Some(t),
            Err(_) => {
                errors.push(FieldError::new(
                    field("passenger_type"),
                    "passenger_type must be adult, child or infant",
                ));
                None
            }
        },
    };

    if p.date_of_birth.is_none() {
        errors.push(FieldError::new(field("date_of_birth"), "date_of_birth is required"));
    }

    if passenger_type == Some(PassengerType::Adult)
        && !present(&p.citizen_id)
        && !present(&p.passport_number)
    {
        errors.push(FieldError::new(
            field("citizen_id"),
            "Adults need a citizen_id or passport_number",
        ));
    }

    let travel_class = parse_class(p.travel_class.as_deref(), field("travel_class"), errors);

    let seat_numbers: Vec<String> = if p.seat_numbers.is_empty() {
        p.seat_number.iter().cloned().collect()
    } else {
        p.seat_numbers.clone()
    };
    let seat_numbers: Vec<String> = seat_numbers
        .iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .collect();
    if !seat_numbers.is_empty() {
        if passenger_type == Some(PassengerType::Infant) {
            errors.push(FieldError::new(field("seat_number"), "Infants travel on an adult's lap and take no seat"));
        } else if seat_numbers.len() != leg_count || seat_numbers.iter().any(|s| s.is_empty()) {
            errors.push(FieldError::new(field("seat_numbers"), "One seat number per flight leg is required"));
        }
    }

    if errors.len() != before {
        return None;
    }
    let (passenger_type, date_of_birth) = (passenger_type?, p.date_of_birth?);
    Some(ValidPassenger {
        first_name: p.first_name.trim().to_string(),
        last_name: p.last_name.trim().to_string(),
        passenger_type,
        date_of_birth,
        gender: p.gender.clone(),
        nationality: p.nationality.clone(),
        citizen_id: p.citizen_id.clone().filter(|v| !blank(v.expose())),
        passport_number: p.passport_number.clone().filter(|v| !blank(v.expose())),
        travel_class,
        seat_numbers,
    })
}

fn seat_mode(passengers: &[ValidPassenger], leg_count: usize, errors: &mut Vec<FieldError>) -> SeatMode {
    let seated: Vec<&ValidPassenger> = passengers
        .iter()
        .filter(|p| p.passenger_type.occupies_seat())
        .collect();
    let choosing = seated.iter().filter(|p| !p.seat_numbers.is_empty()).count();

    if choosing == 0 {
        return SeatMode::Auto;
    }
    if choosing != seated.len() {
        errors.push(FieldError::new(
            "seat_number",
            "Either every passenger chooses a seat or none do",
        ));
        return SeatMode::Manual;
    }

    for leg in 0..leg_count {
        let mut taken = HashSet::new();
        for p in &seated {
            if let Some(seat) = p.seat_numbers.get(leg) {
                if !taken.insert(seat.as_str()) {
                    errors.push(FieldError::new(
                        "seat_number",
                        format!("Seat {} is selected more than once", seat),
                    ));
                }
            }
        }
    }
    SeatMode::Manual
}

/// Structural validation of a booking request. Ages are checked separately once the first
/// departure date is known.
pub fn validate_booking(req: &CreateBookingRequest, max_passengers: usize) -> CoreResult<ValidBooking> {
    let mut errors = Vec::new();

    let contact = validate_contact(req.contact_info.as_ref(), &mut errors);
    let class_type = parse_class(req.class_type.as_deref(), "class_type".to_string(), &mut errors);
    let legs = validate_legs(req, class_type, &mut errors);
    let leg_count = legs.len().max(1);

    if req.passengers.is_empty() {
        errors.push(FieldError::new("passengers", "At least one passenger is required"));
    } else if req.passengers.len() > max_passengers {
        errors.push(FieldError::new(
            "passengers",
            format!("At most {} passengers per booking", max_passengers),
        ));
    }

    let passengers: Vec<ValidPassenger> = req
        .passengers
        .iter()
        .enumerate()
        .filter_map(|(i, p)| validate_passenger(i, p, leg_count, &mut errors))
        .collect();

    if !req.passengers.is_empty() && passengers.len() == req.passengers.len() {
        let adults = passengers.iter().filter(|p| p.passenger_type == PassengerType::Adult).count();
        let infants = passengers.iter().filter(|p| p.passenger_type == PassengerType::Infant).count();
        if adults == 0 {
            errors.push(FieldError::new("passengers", "At least one adult is required"));
        } else if infants > adults {
            errors.push(FieldError::new("passengers", "Each infant must travel with an adult"));
        }
    }

    let seat_mode = seat_mode(&passengers, leg_count, &mut errors);

    if !errors.is_empty() {
        return Err(CoreError::validation(errors));
    }

    Ok(ValidBooking {
        contact,
        passengers,
        legs,
        class_type,
        promotion_code: req
            .promotion_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        seat_mode,
    })
}

/// Whole years between `dob` and `on`.
pub fn age_on(dob: NaiveDate, on: NaiveDate) -> i32 {
    let mut years = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years
}

/// Infants must be under 2 and children 2-11 on the day of the first departure.
pub fn validate_ages(passengers: &[ValidPassenger], first_departure: NaiveDate) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for (i, p) in passengers.iter().enumerate() {
        let field = format!("passengers[{}].date_of_birth", i);
        if p.date_of_birth > first_departure {
            errors.push(FieldError::new(field, "date_of_birth cannot be after departure"));
            continue;
        }
        let age = age_on(p.date_of_birth, first_departure);
        match p.passenger_type {
            PassengerType::Infant if age > INFANT_MAX_AGE => {
                errors.push(FieldError::new(field, "Infants must be under 2 years old at departure"));
            }
            PassengerType::Child if !CHILD_AGES.contains(&age) => {
                errors.push(FieldError::new(field, "Children must be 2 to 11 years old at departure"));
            }
            _ => {}
        }
    }
    errors
}

pub fn validate_passenger_update(update: &PassengerUpdate, today: NaiveDate) -> CoreResult<()> {
    let mut errors = Vec::new();
    if update.is_empty() {
        errors.push(FieldError::new("body", "Nothing to update"));
    }
    if update.first_name.as_deref().is_some_and(blank) {
        errors.push(FieldError::new("first_name", "first_name cannot be blank"));
    }
    if update.last_name.as_deref().is_some_and(blank) {
        errors.push(FieldError::new("last_name", "last_name cannot be blank"));
    }
    if update.date_of_birth.is_some_and(|dob| dob > today) {
        errors.push(FieldError::new("date_of_birth", "date_of_birth cannot be in the future"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CoreError::validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ContactInput, ItineraryLeg};

    fn contact() -> Option<ContactInput> {
        Some(ContactInput {
            first_name: "Minh".into(),
            last_name: "Tran".into(),
            email: "Minh.Tran@example.com".into(),
            phone: "+84 901 234 567".into(),
        })
    }

    fn passenger(kind: &str, dob: &str) -> PassengerInput {
        PassengerInput {
            first_name: "An".into(),
            last_name: "Tran".into(),
            passenger_type: Some(kind.into()),
            date_of_birth: dob.parse().ok(),
            citizen_id: Some(Masked::new("079090001234".into())),
            ..Default::default()
        }
    }

    fn request(passengers: Vec<PassengerInput>) -> CreateBookingRequest {
        CreateBookingRequest {
            flight_id: Some(Uuid::new_v4()),
            passengers,
            contact_info: contact(),
            ..Default::default()
        }
    }

    fn fields(err: CoreError) -> Vec<String> {
        match err {
            CoreError::Validation { details, .. } => details.into_iter().map(|d| d.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_single_leg_booking() {
        let valid = validate_booking(&request(vec![passenger("adult", "1990-01-01")]), 9).unwrap();
        assert_eq!(valid.legs.len(), 1);
        assert_eq!(valid.seat_mode, SeatMode::Auto);
        assert_eq!(valid.contact.email, "minh.tran@example.com");
        assert_eq!(valid.cabin_for(&valid.passengers[0], &valid.legs[0]), CabinClass::Economy);
    }

    #[test]
    fn test_all_failures_reported_together() {
        let mut req = request(vec![PassengerInput {
            passenger_type: Some("pilot".into()),
            ..Default::default()
        }]);
        req.contact_info = Some(ContactInput {
            email: "nobody".into(),
            phone: "123".into(),
            ..Default::default()
        });

        let got = fields(validate_booking(&req, 9).unwrap_err());
        assert_eq!(
            got,
            vec![
                "contact_info.first_name",
                "contact_info.last_name",
                "contact_info.email",
                "contact_info.phone",
                "passengers[0].first_name",
                "passengers[0].last_name",
                "passengers[0].passenger_type",
                "passengers[0].date_of_birth",
            ]
        );
    }

    #[test]
    fn test_party_rules() {
        let no_adult = request(vec![passenger("child", "2018-05-01")]);
        assert_eq!(fields(validate_booking(&no_adult, 9).unwrap_err()), vec!["passengers"]);

        let two_infants = request(vec![
            passenger("adult", "1990-01-01"),
            passenger("infant", "2026-01-01"),
            passenger("infant", "2026-02-01"),
        ]);
        assert_eq!(fields(validate_booking(&two_infants, 9).unwrap_err()), vec!["passengers"]);

        let too_many = request((0..3).map(|_| passenger("adult", "1990-01-01")).collect());
        assert_eq!(fields(validate_booking(&too_many, 2).unwrap_err()), vec!["passengers"]);
    }

    #[test]
    fn test_adult_needs_document() {
        let mut adult = passenger("adult", "1990-01-01");
        adult.citizen_id = Some(Masked::new("  ".into()));
        assert_eq!(
            fields(validate_booking(&request(vec![adult]), 9).unwrap_err()),
            vec!["passengers[0].citizen_id"]
        );
    }

    #[test]
    fn test_seat_selection_modes() {
        let mut a = passenger("adult", "1990-01-01");
        a.seat_number = Some("02a".into());
        let mut b = passenger("adult", "1991-01-01");
        b.seat_number = Some("02B".into());
        let infant = passenger("infant", "2026-03-01");

        let manual = validate_booking(&request(vec![a.clone(), b.clone(), infant]), 9).unwrap();
        assert_eq!(manual.seat_mode, SeatMode::Manual);
        assert_eq!(manual.passengers[0].seat_numbers, vec!["02A"]);

        let mut mixed_b = b.clone();
        mixed_b.seat_number = None;
        assert_eq!(
            fields(validate_booking(&request(vec![a.clone(), mixed_b]), 9).unwrap_err()),
            vec!["seat_number"]
        );

        let mut same = b;
        same.seat_number = Some("02A".into());
        assert_eq!(
            fields(validate_booking(&request(vec![a, same]), 9).unwrap_err()),
            vec!["seat_number"]
        );
    }

    #[test]
    fn test_itinerary_rules() {
        let flight = Uuid::new_v4();
        let leg = |id| ItineraryLeg {
            flight_id: id,
            class_type: Some("Business".into()),
            service_package_id: None,
            baggage_options: vec![],
            meal_options: vec![],
        };

        let mut req = request(vec![passenger("adult", "1990-01-01")]);
        req.flight_id = None;
        req.itinerary = vec![leg(flight), leg(Uuid::new_v4())];
        let valid = validate_booking(&req, 9).unwrap();
        assert_eq!(valid.cabin_for(&valid.passengers[0], &valid.legs[1]), CabinClass::Business);

        req.itinerary = vec![leg(flight), leg(flight)];
        assert_eq!(fields(validate_booking(&req, 9).unwrap_err()), vec!["itinerary[1].flight_id"]);

        req.flight_id = Some(flight);
        req.itinerary = vec![leg(flight)];
        assert_eq!(fields(validate_booking(&req, 9).unwrap_err()), vec!["flight_id"]);
    }

    #[test]
    fn test_add_on_quantity_is_capped_per_service() {
        let bag = Uuid::new_v4();
        let pick = |quantity| AddOnSelection { service_id: bag, quantity };

        let mut req = request(vec![passenger("adult", "1990-01-01")]);
        req.baggage_options = vec![pick(4), pick(MAX_ADDON_QUANTITY - 4), pick(-3)];
        assert!(validate_booking(&req, 9).is_ok());

        req.baggage_options = vec![pick(i32::MAX), pick(i32::MAX)];
        assert_eq!(fields(validate_booking(&req, 9).unwrap_err()), vec!["baggage_options"]);

        req.baggage_options = vec![];
        req.meal_options = vec![pick(MAX_ADDON_QUANTITY + 1)];
        assert_eq!(fields(validate_booking(&req, 9).unwrap_err()), vec!["meal_options"]);

        req.flight_id = None;
        req.meal_options = vec![];
        req.itinerary = vec![ItineraryLeg {
            flight_id: Uuid::new_v4(),
            class_type: None,
            service_package_id: None,
            baggage_options: vec![pick(6), pick(6)],
            meal_options: vec![],
        }];
        assert_eq!(
            fields(validate_booking(&req, 9).unwrap_err()),
            vec!["itinerary[0].baggage_options"]
        );
    }

    #[test]
    fn test_ages_at_first_departure() {
        let departure: NaiveDate = "2026-11-20".parse().unwrap();
        let valid = validate_booking(
            &request(vec![
                passenger("adult", "1990-01-01"),
                passenger("infant", "2024-11-20"),
                passenger("child", "2024-11-21"),
            ]),
            9,
        )
        .unwrap();

        let errors = validate_ages(&valid.passengers, departure);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["passengers[1].date_of_birth", "passengers[2].date_of_birth"]);

        assert_eq!(age_on("2024-11-21".parse().unwrap(), departure), 1);
        assert_eq!(age_on("2024-11-20".parse().unwrap(), departure), 2);
    }

    #[test]
    fn test_passenger_update_rules() {
        let today: NaiveDate = "2026-10-19".parse().unwrap();
        assert!(validate_passenger_update(&PassengerUpdate::default(), today).is_err());

        let rename = PassengerUpdate {
            first_name: Some("Binh".into()),
            ..Default::default()
        };
        assert!(validate_passenger_update(&rename, today).is_ok());

        let blank_name = PassengerUpdate {
            last_name: Some(" ".into()),
            ..Default::default()
        };
        assert!(validate_passenger_update(&blank_name, today).is_err());
    }
}
