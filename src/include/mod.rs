pub mod b2nd_include;
pub mod blosc2_include;
pub mod filters_registry;
