//! CPU rendering: `vello_cpu` pixmaps and image draws, plus the source-over blend and
//! Gaussian blur used for the overlay's drop shadow.

pub(crate) mod blur;
pub(crate) mod composite;
pub(crate) mod draw;
pub(crate) mod shadow;
pub(crate) mod surface;
