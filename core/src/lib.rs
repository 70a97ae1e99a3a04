//! Core engine of the medid deidentification toolset.
//!
//! [`tiff`] models the container, [`svs`] wipes associated images in place,
//! [`label`] and [`barcode`] recover what was on the label, and [`deident`] plus
//! [`batch`] drive whole slides and whole directories. [`synth`] goes the other way and
//! burns made-up PHI into deidentified ultrasound DICOMs.

pub mod barcode;
pub mod batch;
pub mod deident;
pub mod hash;
pub mod label;
pub mod svs;
pub mod synth;
pub mod tiff;
