pub mod luminance;
pub mod mean_luminance_adapter;
