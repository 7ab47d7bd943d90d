use crate::model::{Class, Function, Object, Verb};
use crate::world::WorldStore;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;

/// One line of a JSON-lines world snapshot. spec.md §6 does not mandate an
/// on-disk encoding for the core; this stands in for it well enough to make
/// `server` runnable without a real database engine.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind")]
enum Row {
    Class(Class),
    Object(Object),
    Verb(Verb),
    Function(Function),
}

pub fn dump(world: &WorldStore, path: impl AsRef<Path>) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut out = BufWriter::new(file);
    for c in world.classes.find_all() {
        serde_json::to_writer(&mut out, &Row::Class(c))?;
        out.write_all(b"\n")?;
    }
    for o in world.objects.find_all() {
        serde_json::to_writer(&mut out, &Row::Object(o))?;
        out.write_all(b"\n")?;
    }
    for v in world.verbs.find_all() {
        serde_json::to_writer(&mut out, &Row::Verb(v))?;
        out.write_all(b"\n")?;
    }
    for f in world.functions.find_all() {
        serde_json::to_writer(&mut out, &Row::Function(f))?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

pub fn load(path: impl AsRef<Path>) -> io::Result<WorldStore> {
    let file = std::fs::File::open(path)?;
    let world = WorldStore::new();
    for line in io::BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Row = serde_json::from_str(&line)?;
        match row {
            Row::Class(c) => {
                let id = c.id.clone();
                let _ = world.classes.insert(id.as_str(), c);
            }
            Row::Object(o) => {
                let id = o.id.clone();
                let _ = world.objects.insert(id.as_str(), o);
            }
            Row::Verb(v) => {
                let id = v.id.clone();
                let _ = world.verbs.insert(id.as_str(), v);
            }
            Row::Function(f) => {
                let id = f.id.clone();
                let _ = world.functions.insert(id.as_str(), f);
            }
        }
    }
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Class;
    use chrono::Utc;
    use moor_common::ObjectId;
    use std::collections::BTreeMap;

    #[test]
    fn round_trips_through_a_temp_file() {
        let world = WorldStore::new();
        let class = Class {
            id: ObjectId::from_str("room-class"),
            name: "Room".into(),
            parent_id: None,
            default_properties: BTreeMap::new(),
            description: String::new(),
            is_abstract: false,
            created_at: Utc::now(),
            modified_at: Utc::now(),
        };
        world.classes.insert(class.id.clone().as_str(), class).unwrap();

        let tmp = tempfile::NamedTempFile::new().unwrap();
        dump(&world, tmp.path()).unwrap();
        let loaded = load(tmp.path()).unwrap();
        assert_eq!(loaded.classes.len(), 1);
        assert!(loaded.classes.find_by_id("room-class").is_some());
    }
}
