//! End-to-end tests for the deidentification pipeline over synthetic slides, and for
//! burning synthetic PHI into ultrasound DICOMs.

#[cfg(test)]
mod deident;
#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod synth;
