// Embeddable HTML fragment for a Plotly figure
use serde_json::Value;

/// Element id for the chart in block `index`
pub fn chart_id(index: usize) -> String {
    format!("chart-{}", index)
}

// JSON placed inside a <script> element must not close it early
fn script_safe_json(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

/// Render `figure` (Plotly JSON with `data` and `layout`) as a self-contained
/// fragment that loads plotly.js from `plotly_cdn`. Output depends only on the
/// inputs, so re-rendering the same figure yields identical markup.
pub fn chart_fragment(figure: &Value, index: usize, plotly_cdn: &str) -> String {
    let id = chart_id(index);
    let data = figure.get("data").cloned().unwrap_or(Value::Array(Vec::new()));
    let layout = figure
        .get("layout")
        .cloned()
        .unwrap_or(Value::Object(Default::default()));

    let size = |key: &str| {
        layout
            .get(key)
            .and_then(Value::as_u64)
            .map(|px| format!("{}px", px))
            .unwrap_or_else(|| "100%".to_string())
    };

    format!(
        r#"<div>
    <div id="{id}" class="plotly-graph-div" style="height:{height}; width:{width};"></div>
    <script src="{cdn}" charset="utf-8"></script>
    <script type="text/javascript">
        window.PLOTLYENV = window.PLOTLYENV || {{}};
        if (document.getElementById("{id}")) {{
            Plotly.newPlot("{id}", {data}, {layout}, {{"responsive": true}});
        }}
    </script>
</div>"#,
        id = id,
        height = size("height"),
        width = size("width"),
        cdn = plotly_cdn,
        data = script_safe_json(&data),
        layout = script_safe_json(&layout),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fragment_structure() {
        let fig = json!({
            "data": [{"type": "bar", "x": ["a"], "y": [1]}],
            "layout": {"width": 600, "height": 400}
        });
        let html = chart_fragment(&fig, 3, "https://cdn.example/plotly.min.js");

        assert!(html.contains(r#"id="chart-3""#));
        assert!(html.contains("height:400px; width:600px;"));
        assert!(html.contains(r#"<script src="https://cdn.example/plotly.min.js""#));
        assert!(html.contains(r#"Plotly.newPlot("chart-3", [{"type":"bar""#));
    }

    #[test]
    fn test_script_breakout_is_escaped() {
        let fig = json!({"data": [], "layout": {"title": {"text": "</script><b>"}}});
        let html = chart_fragment(&fig, 1, "cdn");
        assert!(!html.contains("</script><b>"));
        assert!(html.contains(r#"<\/script><b>"#));
    }

    #[test]
    fn test_missing_size_is_responsive() {
        let html = chart_fragment(&json!({}), 2, "cdn");
        assert!(html.contains("height:100%; width:100%;"));
        assert!(html.contains(r#"Plotly.newPlot("chart-2", [], {}"#));
    }
}
