//! Plain-text reports over a loaded scene.

use std::fmt::Write;

use anyhow::Result;
use flex_ecs::Scene;

/// Entity, archetype and string counts, then one line per non-empty archetype.
pub fn stats(scene: &Scene) -> Result<String> {
    let mut out = String::new();
    let occupied: Vec<_> = scene
        .archetypes()
        .iter()
        .filter(|table| !table.is_empty())
        .collect();

    writeln!(out, "entities:   {}", scene.entity_count())?;
    writeln!(
        out,
        "archetypes: {} ({} occupied)",
        scene.archetypes().len(),
        occupied.len()
    )?;
    writeln!(out, "strings:    {}", scene.strings().len())?;
    for table in occupied {
        let names: Vec<_> = table.metas().iter().map(|meta| meta.name).collect();
        writeln!(out, "  {} [{}] x{}", table.id, names.join(", "), table.len())?;
    }
    Ok(out)
}

/// Every entity in index order with its component records.
pub fn dump(scene: &Scene) -> Result<String> {
    let mut out = String::new();
    let mut entities: Vec<_> = scene.entities().collect();
    entities.sort_unstable_by_key(|entity| entity.index());

    for entity in entities {
        let name = scene.entity_name(entity).unwrap_or("-");
        writeln!(out, "{entity} {name:?}")?;
        for meta in scene.components_of(entity)? {
            let record = scene.component_record(entity, meta.id)?;
            writeln!(out, "  {record}")?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flex_math::Position;

    #[test]
    fn test_stats_lists_occupied_archetypes() {
        let mut scene = Scene::new();
        let e = scene.create_entity(Some("Player"));
        scene.add_component(e, Position::new(1.0, 0.0, 0.0)).unwrap();

        let text = stats(&scene).unwrap();
        assert!(text.contains("entities:   1"));
        assert!(text.contains("[EntityName, Position] x1") || text.contains("[Position, EntityName] x1"));
    }

    #[test]
    fn test_dump_prints_records() {
        let mut scene = Scene::new();
        let e = scene.create_entity(Some("Player"));
        scene.add_component(e, Position::new(1.0, 2.0, 3.0)).unwrap();

        let text = dump(&scene).unwrap();
        assert!(text.contains("\"Player\""));
        assert!(text.contains(r#"{"type":"Position","data":{"position":[1.0,2.0,3.0]}}"#));
    }

    #[test]
    fn test_stats_counts_freed_strings() {
        let mut scene = Scene::new();
        let kept = scene.create_entity(Some("Kept"));
        let gone = scene.create_entity(Some("Gone"));
        scene.destroy_entity(gone).unwrap();

        let text = stats(&scene).unwrap();
        assert!(text.contains("entities:   1"));
        assert!(text.contains("strings:    2"));
        assert_eq!(scene.entity_name(kept), Some("Kept"));
    }
}
