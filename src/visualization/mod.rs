mod tables;
mod charts;

pub use tables::{
    format_forecast, print_forecast,
    format_projection_table, print_projection_table,
    format_region_list, print_region_list,
    format_model_issues, print_model_issues,
};
pub use charts::{format_adoption_chart, print_adoption_chart};
