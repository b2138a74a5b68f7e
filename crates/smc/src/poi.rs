use chrono::{DateTime, Utc};

use common::{Error, Poi, PoiKind, Result};

/// State transition for a POI whose zone has been traded through.
///
/// Returns the replacement record (`validated == false`) and, for a
/// non-inverse fair value gap, a new inverse gap: same band, opposite
/// direction, id `inverse_id`, formed on the candle at `filled_at`.
/// The input is left untouched. Invalidating an already-invalid POI is an
/// illegal transition.
pub fn invalidate(
    poi: &Poi,
    inverse_id: u64,
    filled_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(Poi, Option<Poi>)> {
    if !poi.validated {
        return Err(Error::PoiAlreadyInvalid(poi.id));
    }

    let updated = Poi {
        validated: false,
        invalidated_at: Some(now),
        ..poi.clone()
    };

    let inverse = (poi.kind == PoiKind::FairValueGap && !poi.inverse).then(|| Poi {
        id: inverse_id,
        direction: poi.direction.opposite(),
        validated: true,
        inverse: true,
        formed_at: filled_at,
        created_at: now,
        invalidated_at: None,
        source: Some(poi.id),
        touches: None,
        ..poi.clone()
    });

    Ok((updated, inverse))
}
