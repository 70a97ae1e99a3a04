use chrono::{NaiveDate, TimeDelta};
use fake::Fake;
use fake::faker::name::en::LastName;
use rand::Rng;

const FEMALE_FIRST_NAMES: &[&str] = &[
    "Mary", "Patricia", "Jennifer", "Linda", "Elizabeth", "Barbara", "Susan", "Jessica",
    "Sarah", "Karen", "Lisa", "Nancy", "Sandra", "Ashley", "Emily", "Michelle", "Amanda",
    "Melissa", "Deborah", "Laura", "Rebecca", "Sharon", "Cynthia", "Kathleen", "Angela",
];

const MALE_FIRST_NAMES: &[&str] = &[
    "James", "Robert", "John", "Michael", "David", "William", "Richard", "Joseph", "Thomas",
    "Christopher", "Charles", "Daniel", "Matthew", "Anthony", "Mark", "Donald", "Steven",
    "Andrew", "Paul", "Joshua", "Kenneth", "Kevin", "Brian", "Timothy", "Ronald",
];

/// Oldest synthetic patient, in days.
const MAX_AGE_DAYS: i64 = 115 * 365;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Code stored in the DICOM PatientSex attribute.
    pub const fn code(self) -> &'static str {
        match self {
            Gender::Female => "F",
            Gender::Male => "M",
        }
    }

    /// OB/GYN exam folders start with `O` and always get a female patient.
    pub fn for_exam<R: Rng>(exam_dir: &str, rng: &mut R) -> Self {
        if exam_dir.starts_with('O') || rng.random_bool(0.5) {
            Gender::Female
        } else {
            Gender::Male
        }
    }

    fn first_names(self) -> &'static [&'static str] {
        match self {
            Gender::Female => FEMALE_FIRST_NAMES,
            Gender::Male => MALE_FIRST_NAMES,
        }
    }
}

/// A made-up patient whose details get burned into an exam.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patient {
    pub name: String,
    pub ssn: String,
    pub dob: NaiveDate,
    pub gender: Gender,
}

impl Patient {
    pub fn fake<R: Rng>(gender: Gender, today: NaiveDate, rng: &mut R) -> Self {
        let first_names = gender.first_names();
        let first = first_names[rng.random_range(0..first_names.len())];
        let last: String = LastName().fake_with_rng(rng);

        let age = TimeDelta::days(rng.random_range(0..=MAX_AGE_DAYS));
        let dob = today.checked_sub_signed(age).unwrap_or(today);

        Patient {
            name: format!("{first} {last}"),
            ssn: fake_ssn(rng),
            dob,
            gender,
        }
    }

    /// The three annotation lines, top to bottom.
    pub fn burned_lines(&self) -> [String; 3] {
        [
            self.name.clone(),
            format!("SSN: {}", self.ssn),
            format!("DOB: {}", self.dob),
        ]
    }

    /// Birth date in the DICOM DA format.
    pub fn dicom_birth_date(&self) -> String {
        self.dob.format("%Y%m%d").to_string()
    }
}

/// A well-formed SSN: no 000, 666 or 9xx area, no zero group or serial.
fn fake_ssn<R: Rng>(rng: &mut R) -> String {
    let area = loop {
        let area: u16 = rng.random_range(1..900);
        if area != 666 {
            break area;
        }
    };
    let group: u8 = rng.random_range(1..100);
    let serial: u16 = rng.random_range(1..10000);
    format!("{area:03}-{group:02}-{serial:04}")
}
