mod series_chart;

pub use series_chart::draw_series_chart;
