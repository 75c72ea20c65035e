use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use roxmltree::{Document, Node};
use tracing::{debug, info};

use crate::app::{Rect, Vec2};
use crate::assets::SourceRegion;

use super::{
    DialogZone, InteractableZone, MapData, MapLoadError, MapProvider, TileSprite, ZoneKind,
};

const GROUND_LAYER_NAMES: [&str; 4] = ["Ground", "Decorations", "Background", "Others"];
const COLLISION_GROUP: &str = "Collisions";
const MARKER_GROUP: &str = "NPCS";
const OBJECT_GROUP: &str = "Objetos";
const INTERACTABLE_GROUP: &str = "Interactuable";
const START_POINT_NAME: &str = "Start_point";
const DIALOG_ZONE_NAME: &str = "Dialog";
const NEXT_LEVEL_ZONE_NAME: &str = "Next_level";
const DEFAULT_DIALOG_TICKS_PER_CHAR: u32 = 2;
const DEFAULT_DIALOG_SOUND: &str = "default";
const GID_FLAG_MASK: u32 = 0x1FFF_FFFF;

/// Loads orthogonal Tiled maps with CSV tile layers.
#[derive(Debug, Clone)]
pub struct TmxMapProvider {
    maps_dir: PathBuf,
}

impl TmxMapProvider {
    pub fn new(maps_dir: impl Into<PathBuf>) -> Self {
        Self {
            maps_dir: maps_dir.into(),
        }
    }

    pub fn maps_dir(&self) -> &Path {
        &self.maps_dir
    }
}

impl MapProvider for TmxMapProvider {
    fn load(&self, path: &str) -> Result<MapData, MapLoadError> {
        let full_path = self.maps_dir.join(path);
        let raw = fs::read_to_string(&full_path).map_err(|source| MapLoadError::Read {
            path: full_path.clone(),
            source,
        })?;
        let map = parse_map(&full_path, &raw)?;
        info!(
            path = %full_path.display(),
            ground_sprites = map.ground_sprites.len(),
            object_sprites = map.object_sprites.len(),
            obstacles = map.obstacles.len(),
            zones = map.zones.len(),
            has_start_point = map.start_point.is_some(),
            "map_loaded"
        );
        Ok(map)
    }
}

#[derive(Debug, Clone)]
struct Tileset {
    first_gid: u32,
    tile_width: u32,
    tile_height: u32,
    columns: u32,
    tile_count: Option<u32>,
    margin: u32,
    spacing: u32,
    image: Arc<Path>,
}

impl Tileset {
    fn region_for_local_id(&self, local_id: u32) -> SourceRegion {
        let column = local_id % self.columns;
        let row = local_id / self.columns;
        SourceRegion {
            x: self.margin + column * (self.tile_width + self.spacing),
            y: self.margin + row * (self.tile_height + self.spacing),
            width: self.tile_width,
            height: self.tile_height,
        }
    }
}

struct TileLookup<'a> {
    path: &'a Path,
    tilesets: &'a [Tileset],
}

impl TileLookup<'_> {
    fn resolve(&self, raw_gid: u32) -> Result<Option<(&Tileset, SourceRegion)>, MapLoadError> {
        let gid = raw_gid & GID_FLAG_MASK;
        if gid == 0 {
            return Ok(None);
        }
        let tileset = self
            .tilesets
            .iter()
            .rev()
            .find(|tileset| tileset.first_gid <= gid)
            .ok_or_else(|| MapLoadError::UnknownTileGid {
                path: self.path.to_path_buf(),
                gid,
            })?;
        let local_id = gid - tileset.first_gid;
        if tileset.tile_count.is_some_and(|count| local_id >= count) {
            return Err(MapLoadError::UnknownTileGid {
                path: self.path.to_path_buf(),
                gid,
            });
        }
        Ok(Some((tileset, tileset.region_for_local_id(local_id))))
    }
}

pub(super) fn parse_map(path: &Path, raw: &str) -> Result<MapData, MapLoadError> {
    let document = Document::parse(raw).map_err(|source| MapLoadError::Xml {
        path: path.to_path_buf(),
        source,
    })?;
    let root = document.root_element();
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

    let tile_width = required_u32(path, root, "map", "tilewidth")?;
    let tile_height = required_u32(path, root, "map", "tileheight")?;
    let width_tiles = required_u32(path, root, "map", "width")?;
    let height_tiles = required_u32(path, root, "map", "height")?;

    let mut tilesets = Vec::new();
    for node in root.children().filter(|node| node.has_tag_name("tileset")) {
        tilesets.push(parse_tileset(path, base_dir, node)?);
    }
    tilesets.sort_by_key(|tileset| tileset.first_gid);
    let lookup = TileLookup {
        path,
        tilesets: &tilesets,
    };

    let mut map = MapData {
        source: path.to_path_buf(),
        pixel_width: width_tiles * tile_width,
        pixel_height: height_tiles * tile_height,
        ..MapData::default()
    };

    for node in root.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "layer" => {
                let name = node.attribute("name").unwrap_or_default();
                if !GROUND_LAYER_NAMES.contains(&name) {
                    debug!(layer = name, "map_layer_ignored");
                    continue;
                }
                parse_tile_layer(path, node, &lookup, (tile_width, tile_height), &mut map)?;
            }
            "objectgroup" => parse_object_group(path, node, &lookup, &mut map)?,
            _ => {}
        }
    }

    Ok(map)
}

fn parse_tileset(path: &Path, base_dir: &Path, node: Node) -> Result<Tileset, MapLoadError> {
    let first_gid = required_u32(path, node, "tileset", "firstgid")?;
    match node.attribute("source") {
        Some(source) => {
            let tsx_path = base_dir.join(source);
            let raw = fs::read_to_string(&tsx_path).map_err(|source| MapLoadError::Read {
                path: tsx_path.clone(),
                source,
            })?;
            let document = Document::parse(&raw).map_err(|source| MapLoadError::Xml {
                path: tsx_path.clone(),
                source,
            })?;
            let tsx_dir = tsx_path.parent().unwrap_or(base_dir).to_path_buf();
            parse_tileset_body(&tsx_path, &tsx_dir, document.root_element(), first_gid)
        }
        None => parse_tileset_body(path, base_dir, node, first_gid),
    }
}

fn parse_tileset_body(
    path: &Path,
    base_dir: &Path,
    node: Node,
    first_gid: u32,
) -> Result<Tileset, MapLoadError> {
    let tile_width = required_u32(path, node, "tileset", "tilewidth")?;
    let tile_height = required_u32(path, node, "tileset", "tileheight")?;
    if tile_width == 0 || tile_height == 0 {
        return Err(MapLoadError::InvalidAttribute {
            path: path.to_path_buf(),
            attribute: "tilewidth",
            value: format!("{tile_width}x{tile_height}"),
        });
    }
    let margin = optional_u32(path, node, "margin")?.unwrap_or(0);
    let spacing = optional_u32(path, node, "spacing")?.unwrap_or(0);
    let tile_count = optional_u32(path, node, "tilecount")?;
    let image_node = node
        .children()
        .find(|child| child.has_tag_name("image"))
        .ok_or_else(|| MapLoadError::MissingAttribute {
            path: path.to_path_buf(),
            element: "tileset",
            attribute: "image",
        })?;
    let image_source = image_node
        .attribute("source")
        .ok_or_else(|| MapLoadError::MissingAttribute {
            path: path.to_path_buf(),
            element: "image",
            attribute: "source",
        })?;
    let columns = match optional_u32(path, node, "columns")? {
        Some(columns) => columns,
        None => {
            let image_width = required_u32(path, image_node, "image", "width")?;
            (image_width.saturating_sub(2 * margin) + spacing) / (tile_width + spacing)
        }
    };
    if columns == 0 {
        return Err(MapLoadError::InvalidAttribute {
            path: path.to_path_buf(),
            attribute: "columns",
            value: columns.to_string(),
        });
    }

    Ok(Tileset {
        first_gid,
        tile_width,
        tile_height,
        columns,
        tile_count,
        margin,
        spacing,
        image: Arc::from(base_dir.join(image_source).as_path()),
    })
}

fn parse_tile_layer(
    path: &Path,
    node: Node,
    lookup: &TileLookup,
    (tile_width, tile_height): (u32, u32),
    map: &mut MapData,
) -> Result<(), MapLoadError> {
    let layer_name = node.attribute("name").unwrap_or_default();
    let layer_width = required_u32(path, node, "layer", "width")?;
    let Some(data) = node.children().find(|child| child.has_tag_name("data")) else {
        return Ok(());
    };
    let encoding = data.attribute("encoding").unwrap_or("xml");
    if encoding != "csv" {
        return Err(MapLoadError::UnsupportedEncoding {
            path: path.to_path_buf(),
            layer: layer_name.to_string(),
            encoding: encoding.to_string(),
        });
    }

    let text = data.text().unwrap_or_default();
    for (index, cell) in text
        .split(',')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .enumerate()
    {
        let raw_gid = cell
            .parse::<u32>()
            .map_err(|_| MapLoadError::InvalidAttribute {
                path: path.to_path_buf(),
                attribute: "data",
                value: cell.to_string(),
            })?;
        let Some((tileset, region)) = lookup.resolve(raw_gid)? else {
            continue;
        };
        let column = index as u32 % layer_width.max(1);
        let row = index as u32 / layer_width.max(1);
        // Oversized tiles hang upward from the bottom of their grid cell.
        let position = Vec2::new(
            (column * tile_width) as f32,
            ((row + 1) * tile_height) as f32 - tileset.tile_height as f32,
        );
        map.ground_sprites.push(TileSprite {
            image: Arc::clone(&tileset.image),
            source: region,
            position,
            size: Vec2::new(region.width as f32, region.height as f32),
        });
    }
    Ok(())
}

fn parse_object_group(
    path: &Path,
    node: Node,
    lookup: &TileLookup,
    map: &mut MapData,
) -> Result<(), MapLoadError> {
    let group_name = node.attribute("name").unwrap_or_default();
    for object in node.children().filter(|child| child.has_tag_name("object")) {
        let rect = object_rect(path, object)?;
        let name = object.attribute("name").unwrap_or_default();
        match group_name {
            COLLISION_GROUP => map.obstacles.push(rect),
            MARKER_GROUP if name == START_POINT_NAME => {
                map.start_point = Some(if rect.width > 0.0 || rect.height > 0.0 {
                    rect.mid_bottom()
                } else {
                    rect.top_left()
                });
            }
            OBJECT_GROUP => {
                let Some(raw_gid) = optional_u32(path, object, "gid")? else {
                    continue;
                };
                let Some((tileset, region)) = lookup.resolve(raw_gid)? else {
                    continue;
                };
                let image = Arc::clone(&tileset.image);
                let size = if rect.width > 0.0 && rect.height > 0.0 {
                    Vec2::new(rect.width, rect.height)
                } else {
                    Vec2::new(region.width as f32, region.height as f32)
                };
                // Tile objects are anchored at their bottom-left corner.
                map.object_sprites.push(TileSprite {
                    image,
                    source: region,
                    position: Vec2::new(rect.x, rect.y - size.y),
                    size,
                });
            }
            INTERACTABLE_GROUP => {
                let kind = match name {
                    DIALOG_ZONE_NAME => ZoneKind::Dialog(DialogZone {
                        text: property(object, "Text").unwrap_or_default(),
                        ticks_per_char: property(object, "speed")
                            .and_then(|value| value.trim().parse::<u32>().ok())
                            .unwrap_or(DEFAULT_DIALOG_TICKS_PER_CHAR),
                        sound: property(object, "sound")
                            .unwrap_or_else(|| DEFAULT_DIALOG_SOUND.to_string()),
                        portrait: property(object, "img"),
                    }),
                    NEXT_LEVEL_ZONE_NAME => ZoneKind::NextLevel {
                        next_map: property(object, "next").unwrap_or_default(),
                    },
                    other => {
                        debug!(name = other, "interactable_object_ignored");
                        continue;
                    }
                };
                map.zones.push(InteractableZone { rect, kind });
            }
            _ => {}
        }
    }
    Ok(())
}

fn object_rect(path: &Path, object: Node) -> Result<Rect, MapLoadError> {
    Ok(Rect::new(
        optional_f32(path, object, "x")?.unwrap_or(0.0),
        optional_f32(path, object, "y")?.unwrap_or(0.0),
        optional_f32(path, object, "width")?.unwrap_or(0.0),
        optional_f32(path, object, "height")?.unwrap_or(0.0),
    ))
}

/// Property value from either the `value` attribute or the element text.
fn property(object: Node, name: &str) -> Option<String> {
    let properties = object
        .children()
        .find(|child| child.has_tag_name("properties"))?;
    let property = properties
        .children()
        .filter(|child| child.has_tag_name("property"))
        .find(|child| child.attribute("name") == Some(name))?;
    property
        .attribute("value")
        .or_else(|| property.text())
        .map(ToString::to_string)
}

fn required_u32(
    path: &Path,
    node: Node,
    element: &'static str,
    attribute: &'static str,
) -> Result<u32, MapLoadError> {
    optional_u32(path, node, attribute)?.ok_or_else(|| MapLoadError::MissingAttribute {
        path: path.to_path_buf(),
        element,
        attribute,
    })
}

fn optional_u32(
    path: &Path,
    node: Node,
    attribute: &'static str,
) -> Result<Option<u32>, MapLoadError> {
    node.attribute(attribute)
        .map(|value| {
            value
                .trim()
                .parse::<u32>()
                .map_err(|_| MapLoadError::InvalidAttribute {
                    path: path.to_path_buf(),
                    attribute,
                    value: value.to_string(),
                })
        })
        .transpose()
}

fn optional_f32(
    path: &Path,
    node: Node,
    attribute: &'static str,
) -> Result<Option<f32>, MapLoadError> {
    node.attribute(attribute)
        .map(|value| {
            value
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|parsed| parsed.is_finite())
                .ok_or_else(|| MapLoadError::InvalidAttribute {
                    path: path.to_path_buf(),
                    attribute,
                    value: value.to_string(),
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="3" height="2" tilewidth="16" tileheight="16">
 <tileset firstgid="1" name="terrain" tilewidth="16" tileheight="16" tilecount="4" columns="2">
  <image source="tiles/terrain.png" width="32" height="32"/>
 </tileset>
 <layer id="1" name="Ground" width="3" height="2">
  <data encoding="csv">
1,2,0,
3,4,1
</data>
 </layer>
 <layer id="2" name="Scratch" width="3" height="2">
  <data encoding="csv">1,1,1,1,1,1</data>
 </layer>
 <objectgroup id="3" name="Collisions">
  <object id="1" x="32" y="0" width="16" height="32"/>
 </objectgroup>
 <objectgroup id="4" name="NPCS">
  <object id="2" name="Start_point" x="8" y="20"/>
 </objectgroup>
 <objectgroup id="5" name="Objetos">
  <object id="3" gid="4" x="16" y="32" width="16" height="16"/>
 </objectgroup>
 <objectgroup id="6" name="Interactuable">
  <object id="4" name="Dialog" x="0" y="0" width="16" height="16">
   <properties>
    <property name="Text" value="['Hola', 'Adios']"/>
    <property name="speed" type="int" value="3"/>
   </properties>
  </object>
  <object id="5" name="Next_level" x="16" y="0" width="16" height="8">
   <properties>
    <property name="next" value="level2.tmx"/>
   </properties>
  </object>
 </objectgroup>
</map>
"#;

    fn parse_sample() -> MapData {
        parse_map(Path::new("/maps/level1.tmx"), SAMPLE_MAP).expect("sample map parses")
    }

    #[test]
    fn csv_ground_layers_become_ground_sprites() {
        let map = parse_sample();
        assert_eq!((map.pixel_width, map.pixel_height), (48, 32));
        assert_eq!(map.ground_sprites.len(), 5);
        let fourth = &map.ground_sprites[3];
        assert_eq!(fourth.position, Vec2::new(16.0, 16.0));
        assert_eq!(
            fourth.source,
            SourceRegion {
                x: 16,
                y: 16,
                width: 16,
                height: 16
            }
        );
        assert_eq!(&*fourth.image, Path::new("/maps/tiles/terrain.png"));
    }

    #[test]
    fn object_groups_map_to_obstacles_start_point_and_zones() {
        let map = parse_sample();
        assert_eq!(map.obstacles, vec![Rect::new(32.0, 0.0, 16.0, 32.0)]);
        assert_eq!(map.start_point, Some(Vec2::new(8.0, 20.0)));
        assert_eq!(map.object_sprites.len(), 1);
        assert_eq!(map.object_sprites[0].position, Vec2::new(16.0, 16.0));
        assert_eq!(map.zones.len(), 2);
        match &map.zones[0].kind {
            ZoneKind::Dialog(dialog) => {
                assert_eq!(dialog.text, "['Hola', 'Adios']");
                assert_eq!(dialog.ticks_per_char, 3);
                assert_eq!(dialog.sound, "default");
                assert_eq!(dialog.portrait, None);
            }
            other => panic!("expected dialog zone, got {other:?}"),
        }
        assert_eq!(
            map.zones[1].kind,
            ZoneKind::NextLevel {
                next_map: "level2.tmx".to_string()
            }
        );
    }

    #[test]
    fn unknown_gid_is_an_error() {
        let raw = SAMPLE_MAP.replace("3,4,1", "3,9,1");
        let error = parse_map(Path::new("bad.tmx"), &raw).expect_err("gid 9 is out of range");
        assert!(matches!(error, MapLoadError::UnknownTileGid { gid: 9, .. }));
    }

    #[test]
    fn base64_layers_are_rejected() {
        let raw = SAMPLE_MAP.replacen("encoding=\"csv\"", "encoding=\"base64\"", 1);
        let error = parse_map(Path::new("bad.tmx"), &raw).expect_err("base64 unsupported");
        assert!(matches!(error, MapLoadError::UnsupportedEncoding { .. }));
    }

    #[test]
    fn missing_start_point_defaults_to_origin() {
        let raw = SAMPLE_MAP.replace("Start_point", "Villager");
        let map = parse_map(Path::new("m.tmx"), &raw).expect("parses");
        assert_eq!(map.start_point, None);
        assert_eq!(map.start_point_or_origin(), Vec2::ZERO);
    }

    #[test]
    fn provider_reads_relative_to_maps_dir_and_external_tilesets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tsx = r#"<?xml version="1.0"?>
<tileset name="ext" tilewidth="8" tileheight="8" tilecount="4">
 <image source="ext.png" width="16" height="16"/>
</tileset>"#;
        fs::write(dir.path().join("ext.tsx"), tsx).expect("write tsx");
        let map = r#"<map width="1" height="1" tilewidth="8" tileheight="8">
 <tileset firstgid="1" source="ext.tsx"/>
 <layer name="Decorations" width="1" height="1"><data encoding="csv">3</data></layer>
</map>"#;
        fs::write(dir.path().join("tiny.tmx"), map).expect("write tmx");

        let provider = TmxMapProvider::new(dir.path());
        let loaded = provider.load("tiny.tmx").expect("loads");
        assert_eq!(loaded.ground_sprites.len(), 1);
        assert_eq!(loaded.ground_sprites[0].source.y, 8);
        assert_eq!(
            &*loaded.ground_sprites[0].image,
            dir.path().join("ext.png").as_path()
        );

        let missing = provider.load("nope.tmx").expect_err("missing map");
        assert!(matches!(missing, MapLoadError::Read { .. }));
    }
}
