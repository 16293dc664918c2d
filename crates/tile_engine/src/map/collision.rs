use std::cmp::Ordering;
use std::collections::HashMap;

use crate::geometry::{Rect, Vec2};

use super::layer::TileLayer;
use super::render::overlapped_span;
use super::tile_config::{TileConfig, TileId};

/// Minimum translation for one query: move the query by
/// `normal * penetration` to separate it from the chosen tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub normal: Vec2,
    pub penetration: f32,
}

/// A single solid tile overlapping a query rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub tile_x: u32,
    pub tile_y: u32,
    pub tile_rect: Rect,
    pub normal: Vec2,
    pub penetration: f32,
}

impl Contact {
    pub fn collision(&self) -> Collision {
        Collision {
            normal: self.normal,
            penetration: self.penetration,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.normal.x != 0.0
    }
}

/// Separating axis and penetration of `query` against `tile`, or `None` when
/// they only touch or are apart. The shallower axis wins; ties go to x.
pub(crate) fn contact_between(query: &Rect, tile: &Rect) -> Option<(Vec2, f32)> {
    if !query.intersects(tile) {
        return None;
    }
    let (dx, dy) = query.overlap(tile);
    let query_center = query.center();
    let tile_center = tile.center();
    if dx <= dy {
        let sign = if query_center.x > tile_center.x { 1.0 } else { -1.0 };
        Some((Vec2::new(sign, 0.0), dx))
    } else {
        let sign = if query_center.y > tile_center.y { 1.0 } else { -1.0 };
        Some((Vec2::new(0.0, sign), dy))
    }
}

/// Every solid cell of `layer` strictly overlapping `query`, row-major.
pub(crate) fn solid_contacts(
    layer: &TileLayer,
    tile_width: u32,
    tile_height: u32,
    configs: &HashMap<TileId, TileConfig>,
    query: &Rect,
) -> Vec<Contact> {
    let (x_start, x_end) = overlapped_span(query.left(), query.right(), tile_width, layer.width());
    let (y_start, y_end) = overlapped_span(query.top(), query.bottom(), tile_height, layer.height());

    let mut contacts = Vec::new();
    for tile_y in y_start..y_end {
        for tile_x in x_start..x_end {
            let Some(tile_id) = layer.tile_at(tile_x, tile_y) else {
                continue;
            };
            if !configs.get(&tile_id).is_some_and(|config| config.solid) {
                continue;
            }
            let tile_rect = Rect::new(
                (tile_x * tile_width) as f32,
                (tile_y * tile_height) as f32,
                tile_width as f32,
                tile_height as f32,
            );
            if let Some((normal, penetration)) = contact_between(query, &tile_rect) {
                contacts.push(Contact {
                    tile_x,
                    tile_y,
                    tile_rect,
                    normal,
                    penetration,
                });
            }
        }
    }
    contacts
}

/// Shallowest contact; ties prefer x-axis contacts, then row-major tile order.
pub(crate) fn select_contact(contacts: &[Contact]) -> Option<&Contact> {
    contacts.iter().min_by(|a, b| compare_contacts(a, b))
}

fn compare_contacts(a: &Contact, b: &Contact) -> Ordering {
    let axis_rank = |contact: &Contact| u8::from(!contact.is_horizontal());
    a.penetration
        .total_cmp(&b.penetration)
        .then_with(|| axis_rank(a).cmp(&axis_rank(b)))
        .then_with(|| a.tile_y.cmp(&b.tile_y))
        .then_with(|| a.tile_x.cmp(&b.tile_x))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(tile_x: u32, tile_y: u32, normal: Vec2, penetration: f32) -> Contact {
        Contact {
            tile_x,
            tile_y,
            tile_rect: Rect::new(tile_x as f32 * 32.0, tile_y as f32 * 32.0, 32.0, 32.0),
            normal,
            penetration,
        }
    }

    #[test]
    fn touching_edges_do_not_collide() {
        let tile = Rect::new(32.0, 32.0, 32.0, 32.0);
        assert_eq!(contact_between(&Rect::new(16.0, 32.0, 16.0, 16.0), &tile), None);
        assert_eq!(contact_between(&Rect::new(32.0, 64.0, 16.0, 16.0), &tile), None);
    }

    #[test]
    fn shallower_axis_is_chosen() {
        let tile = Rect::new(0.0, 0.0, 32.0, 32.0);
        let (normal, penetration) =
            contact_between(&Rect::new(28.0, 4.0, 16.0, 16.0), &tile).expect("contact");
        assert_eq!(normal, Vec2::new(1.0, 0.0));
        assert_eq!(penetration, 4.0);

        let (normal, penetration) =
            contact_between(&Rect::new(4.0, -10.0, 16.0, 16.0), &tile).expect("contact");
        assert_eq!(normal, Vec2::new(0.0, -1.0));
        assert_eq!(penetration, 6.0);
    }

    #[test]
    fn equal_overlap_prefers_x_and_equal_centers_push_negative() {
        let tile = Rect::new(0.0, 0.0, 32.0, 32.0);
        let (normal, penetration) = contact_between(&tile, &tile).expect("contact");
        assert_eq!(normal, Vec2::new(-1.0, 0.0));
        assert_eq!(penetration, 32.0);
    }

    #[test]
    fn smallest_penetration_wins() {
        let contacts = [
            contact(0, 0, Vec2::new(0.0, -1.0), 8.0),
            contact(1, 0, Vec2::new(1.0, 0.0), 3.0),
            contact(2, 0, Vec2::new(0.0, 1.0), 5.0),
        ];
        let chosen = select_contact(&contacts).expect("contact");
        assert_eq!((chosen.tile_x, chosen.penetration), (1, 3.0));
    }

    #[test]
    fn ties_prefer_x_axis_then_row_major_order() {
        let contacts = [
            contact(1, 0, Vec2::new(0.0, 1.0), 4.0),
            contact(3, 1, Vec2::new(-1.0, 0.0), 4.0),
            contact(2, 1, Vec2::new(1.0, 0.0), 4.0),
        ];
        let chosen = select_contact(&contacts).expect("contact");
        assert_eq!((chosen.tile_x, chosen.tile_y), (2, 1));

        let same_axis = [
            contact(5, 2, Vec2::new(0.0, -1.0), 2.0),
            contact(7, 1, Vec2::new(0.0, -1.0), 2.0),
            contact(4, 1, Vec2::new(0.0, -1.0), 2.0),
        ];
        let chosen = select_contact(&same_axis).expect("contact");
        assert_eq!((chosen.tile_x, chosen.tile_y), (4, 1));
    }

    #[test]
    fn empty_candidates_select_nothing() {
        assert!(select_contact(&[]).is_none());
    }

    #[test]
    fn only_solid_configured_cells_are_contacts() {
        let mut layer = TileLayer::new(4, 4).expect("layer");
        layer.set_tile(1, 1, 1).expect("set");
        layer.set_tile(2, 1, 2).expect("set");
        layer.set_tile(1, 2, 9).expect("set");
        let configs: HashMap<TileId, TileConfig> =
            [(1, TileConfig::solid()), (2, TileConfig::default())]
                .into_iter()
                .collect();

        let contacts = solid_contacts(
            &layer,
            32,
            32,
            &configs,
            &Rect::new(40.0, 40.0, 48.0, 48.0),
        );
        assert_eq!(contacts.len(), 1);
        assert_eq!((contacts[0].tile_x, contacts[0].tile_y), (1, 1));
        assert_eq!(contacts[0].tile_rect, Rect::new(32.0, 32.0, 32.0, 32.0));
    }

    #[test]
    fn queries_outside_the_grid_are_empty() {
        let mut layer = TileLayer::new(2, 2).expect("layer");
        layer.fill(1);
        let configs: HashMap<TileId, TileConfig> = [(1, TileConfig::solid())].into_iter().collect();
        for query in [
            Rect::new(-100.0, -100.0, 16.0, 16.0),
            Rect::new(64.0, 0.0, 16.0, 16.0),
            Rect::new(f32::NAN, 0.0, 16.0, 16.0),
        ] {
            assert!(solid_contacts(&layer, 32, 32, &configs, &query).is_empty());
        }
    }
}
