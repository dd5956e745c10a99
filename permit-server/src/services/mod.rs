pub mod pdp;
