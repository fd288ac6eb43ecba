use crate::models::BlogRequest;

pub const BLOG_POST: &str = include_str!("../data/prompts/blog.txt");
pub const IMAGE_DESCRIPTION: &str = include_str!("../data/prompts/image_description.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Instruction for the article body.
pub fn blog_post(request: &BlogRequest) -> String {
    let keywords = request.keywords().join(", ");
    let word_count = request.target_word_count().to_string();
    render(
        BLOG_POST,
        &[
            ("title", request.title()),
            ("keywords", &keywords),
            ("word_count", &word_count),
        ],
    )
}

/// Instruction for one illustration description. Carries no memory of earlier
/// descriptions, so the diversity it asks for is not guaranteed.
pub fn image_description(title: &str) -> String {
    render(IMAGE_DESCRIPTION, &[("title", title)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Hello {{name}}!", &[("name", "world")]),
            "Hello world!"
        );
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{{a}} and {{b}}", &[("a", "cats")]), "cats and {{b}}");
    }

    #[test]
    fn test_templates_have_placeholders() {
        assert!(BLOG_POST.contains("{{title}}"));
        assert!(BLOG_POST.contains("{{keywords}}"));
        assert!(BLOG_POST.contains("{{word_count}}"));
        assert!(IMAGE_DESCRIPTION.contains("{{title}}"));
    }

    #[test]
    fn test_blog_post_embeds_request_fields() {
        let request = BlogRequest::new(
            "Rust vs Go".to_string(),
            vec!["performance".to_string(), "concurrency".to_string()],
            400,
            2,
        )
        .unwrap();

        let prompt = blog_post(&request);
        assert!(prompt.contains("\"Rust vs Go\""));
        assert!(prompt.contains("\"performance, concurrency\""));
        assert!(prompt.contains("approximately 400 words"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_image_description_embeds_title() {
        let prompt = image_description("Tide Pools");
        assert!(prompt.contains("\"Tide Pools\""));
        assert!(prompt.contains("diversity"));
    }
}
