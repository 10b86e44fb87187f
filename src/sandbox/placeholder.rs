// Built-in chart used when a snippet yields no usable figure at render time
use serde_json::{json, Value};

use super::ChartStyle;

pub const PLACEHOLDER_TITLE: &str = "(placeholder) Iris Sepal Plot";

// (species, sepal_width, sepal_length)
const IRIS_SAMPLE: &[(&str, &[(f64, f64)])] = &[
    (
        "setosa",
        &[(3.5, 5.1), (3.0, 4.9), (3.2, 4.7), (3.1, 4.6), (3.6, 5.0), (3.9, 5.4)],
    ),
    (
        "versicolor",
        &[(3.2, 7.0), (3.2, 6.4), (3.1, 6.9), (2.3, 5.5), (2.8, 6.5), (2.8, 5.7)],
    ),
    (
        "virginica",
        &[(3.3, 6.3), (2.7, 5.8), (3.0, 7.1), (2.9, 6.3), (3.0, 6.5), (3.0, 7.6)],
    ),
];

/// Plotly figure JSON for the placeholder scatter, styled like report charts
pub fn placeholder_figure(style: &ChartStyle) -> Value {
    let data: Vec<Value> = IRIS_SAMPLE
        .iter()
        .map(|(species, points)| {
            json!({
                "type": "scatter",
                "mode": "markers",
                "name": species,
                "legendgroup": species,
                "x": points.iter().map(|(w, _)| *w).collect::<Vec<_>>(),
                "y": points.iter().map(|(_, l)| *l).collect::<Vec<_>>(),
            })
        })
        .collect();

    let mut layout = json!({
        "title": { "text": PLACEHOLDER_TITLE },
        "xaxis": { "title": { "text": "sepal_width" } },
        "yaxis": { "title": { "text": "sepal_length" } },
        "legend": { "title": { "text": "species" } },
        "width": style.width,
        "height": style.height,
    });

    if style.template.contains("dark") {
        layout["paper_bgcolor"] = json!("rgb(17,17,17)");
        layout["plot_bgcolor"] = json!("rgb(17,17,17)");
        layout["font"] = json!({ "color": "#f2f5fa" });
    }

    json!({ "data": data, "layout": layout })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_shape() {
        let style = ChartStyle {
            template: "plotly_dark".to_string(),
            width: 600,
            height: 400,
        };
        let fig = placeholder_figure(&style);

        assert_eq!(fig["data"].as_array().map(Vec::len), Some(3));
        assert_eq!(fig["layout"]["title"]["text"], PLACEHOLDER_TITLE);
        assert_eq!(fig["layout"]["width"], 600);
        assert!(fig["layout"].get("paper_bgcolor").is_some());
    }

    #[test]
    fn test_light_placeholder_has_no_dark_colors() {
        let style = ChartStyle {
            template: "plotly_white".to_string(),
            width: 300,
            height: 200,
        };
        let fig = placeholder_figure(&style);
        assert!(fig["layout"].get("paper_bgcolor").is_none());
        assert_eq!(fig["layout"]["height"], 200);
    }
}
