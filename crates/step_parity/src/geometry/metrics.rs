use super::types::*;
use crate::constants::MAX_BRACKET_DISTANCE_SQ;

/// Unit-vector component raised to the 4th power, keeping its sign
fn signed_fourth_power(component: f64, distance: f64) -> f64 {
    let unit = component / distance;
    let value = unit.powi(4);
    if unit <= 0.0 { -value } else { value }
}

impl StageLayout {
    /// Squared euclidean distance between two panels
    pub fn distance_sq(&self, a: usize, b: usize) -> f64 {
        let p1 = self.point(a);
        let p2 = self.point(b);
        (p1.y - p2.y) * (p1.y - p2.y) + (p1.x - p2.x) * (p1.x - p2.x)
    }

    /// How far `right` lies to the right of `left`; negative when the pair faces backwards
    pub fn x_difference(&self, left: usize, right: usize) -> f64 {
        if left == right {
            return 0.0;
        }
        let (l, r) = (self.point(left), self.point(right));
        let dx = r.x - l.x;
        let dy = r.y - l.y;
        signed_fourth_power(dx, (dx * dx + dy * dy).sqrt())
    }

    /// How far `toe` lies in front of `heel` along y
    pub fn y_difference(&self, heel: usize, toe: usize) -> f64 {
        if heel == toe {
            return 0.0;
        }
        let (h, t) = (self.point(heel), self.point(toe));
        let dx = t.x - h.x;
        let dy = t.y - h.y;
        signed_fourth_power(dy, (dx * dx + dy * dy).sqrt())
    }

    /// Midpoint of one foot; falls back to whichever part is placed
    pub fn average_point(&self, a: Option<usize>, b: Option<usize>) -> StagePoint {
        match (a, b) {
            (None, None) => StagePoint::ORIGIN,
            (Some(a), None) => self.point(a),
            (None, Some(b)) => self.point(b),
            (Some(a), Some(b)) => {
                let (p1, p2) = (self.point(a), self.point(b));
                StagePoint::new((p1.x + p2.x) / 2.0, (p1.y + p2.y) / 2.0)
            }
        }
    }

    /// Can one foot cover both panels at once?
    pub fn bracket_check(&self, a: usize, b: usize) -> bool {
        self.distance_sq(a, b) <= MAX_BRACKET_DISTANCE_SQ
    }
}
