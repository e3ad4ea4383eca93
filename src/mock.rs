//! Placeholder project served by the relay when the backend is unreachable.

use crate::types::GeneratedProject;

/// Build a landing-page project for `name` locally, without the backend.
pub fn mock_project(name: &str, description: &str) -> GeneratedProject {
    let now = chrono::Utc::now();
    GeneratedProject {
        id: now.timestamp_millis().to_string(),
        name: name.to_string(),
        description: description.to_string(),
        html: mock_html(name, description),
        css: MOCK_CSS.to_string(),
        js: mock_js(name),
        created_at: now.to_rfc3339(),
        status: None,
    }
}

fn mock_html(name: &str, description: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{name}</title>
    <link rel="stylesheet" href="style.css">
</head>
<body>
    <div class="container">
        <header class="hero">
            <h1>{name}</h1>
            <p class="subtitle">{description}</p>
            <button class="cta-button" id="cta">Get Started</button>
        </header>

        <section class="features">
            <div class="feature">
                <h3>Feature 1</h3>
                <p>Amazing functionality that makes this project special.</p>
            </div>
            <div class="feature">
                <h3>Feature 2</h3>
                <p>Innovative solutions for modern problems.</p>
            </div>
            <div class="feature">
                <h3>Feature 3</h3>
                <p>Cutting-edge technology at your fingertips.</p>
            </div>
        </section>
    </div>
    <script src="script.js"></script>
</body>
</html>"#
    )
}

fn mock_js(name: &str) -> String {
    // Names are embedded in single-quoted JS strings.
    let safe = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        r#"document.addEventListener('DOMContentLoaded', function() {{
    console.log('{safe} is loaded and ready!');

    document.documentElement.style.scrollBehavior = 'smooth';

    const ctaButton = document.getElementById('cta');
    if (ctaButton) {{
        ctaButton.addEventListener('click', function() {{
            alert('Welcome to {safe}! This is your AI-generated project.');
            this.style.background = 'linear-gradient(45deg, #4ecdc4, #44a08d)';
            this.textContent = 'Awesome!';
        }});
    }}

    document.querySelectorAll('.feature').forEach(function(feature) {{
        feature.addEventListener('mouseenter', function() {{
            this.style.background = 'linear-gradient(45deg, #f8f9fa, #e9ecef)';
        }});
        feature.addEventListener('mouseleave', function() {{
            this.style.background = 'white';
        }});
    }});
}});"#
    )
}

const MOCK_CSS: &str = r#"* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
    line-height: 1.6;
    color: #333;
}

.container {
    max-width: 1200px;
    margin: 0 auto;
    padding: 0 20px;
}

.hero {
    background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
    color: white;
    text-align: center;
    padding: 100px 20px;
    min-height: 80vh;
    display: flex;
    flex-direction: column;
    justify-content: center;
    align-items: center;
}

.hero h1 {
    font-size: 3.5rem;
    margin-bottom: 1rem;
}

.cta-button {
    background: #ff6b6b;
    color: white;
    border: none;
    padding: 15px 40px;
    font-size: 1.2rem;
    border-radius: 50px;
    cursor: pointer;
}

.features {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(300px, 1fr));
    gap: 40px;
    padding: 80px 20px;
    background: #f8f9fa;
}

.feature {
    background: white;
    padding: 40px;
    border-radius: 15px;
    text-align: center;
    box-shadow: 0 10px 30px rgba(0,0,0,0.1);
}

@media (max-width: 768px) {
    .hero h1 {
        font-size: 2.5rem;
    }

    .features {
        grid-template-columns: 1fr;
    }
}"#;
