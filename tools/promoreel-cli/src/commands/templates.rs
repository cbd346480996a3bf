//! List the built-in style templates, or show one in detail.

use promoreel_job_model::{StyleTemplate, TemplateRegistry};
use promoreel_render_engine::timing::TimingPlan;

pub fn run(id: Option<String>) -> anyhow::Result<()> {
    let registry = TemplateRegistry::builtin();
    match id {
        Some(id) => show(lookup(&registry, &id)?),
        None => list(&registry),
    }
    Ok(())
}

/// Strict lookup; unknown ids are an error here rather than the default.
pub fn lookup<'a>(registry: &'a TemplateRegistry, id: &str) -> anyhow::Result<&'a StyleTemplate> {
    registry.get(id).ok_or_else(|| {
        let known: Vec<_> = registry.iter().map(|t| t.id.as_str()).collect();
        anyhow::anyhow!("Unknown template '{id}' (known: {})", known.join(", "))
    })
}

fn list(registry: &TemplateRegistry) {
    let default_id = registry.default_template().id.clone();

    println!("{:<8}  {:>5}  {:>7}  {:<20}  GRADE", "ID", "BPM", "SCENE", "TRACK");
    for template in registry.iter() {
        let scene = TimingPlan::compute(template, 1, None).per_scene_secs;
        let marker = if template.id == default_id { " (default)" } else { "" };
        println!(
            "{:<8}  {:>5}  {:>6.2}s  {:<20}  {}{marker}",
            template.id, template.bpm, scene, template.background_track, template.color_grade
        );
    }
}

fn show(template: &StyleTemplate) {
    let timing = TimingPlan::compute(template, 1, None);
    println!("Template: {}", template.id);
    println!("  Tempo: {} BPM", template.bpm);
    println!("  Scene length: {:.2}s", timing.per_scene_secs);
    println!("  Transition: {}", template.transition.as_str());
    println!("  Track: {}", template.background_track);
    println!("  Grade: {}", template.color_grade);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_strict() {
        let registry = TemplateRegistry::builtin();
        assert_eq!(lookup(&registry, "party").unwrap().id, "party");
        let err = lookup(&registry, "disco").unwrap_err().to_string();
        assert!(err.contains("disco"));
        assert!(err.contains("luxury"));
    }
}
