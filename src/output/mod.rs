pub mod formatter;

pub use formatter::{
    format_breakdown, format_json, format_score, format_score_table, format_trend, format_tsv,
    format_weights, should_use_colors,
};
