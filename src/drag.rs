#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Header-handle drag of a modal. Positions are not clamped to the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DragState {
    last_pointer: Option<Point>,
}

impl DragState {
    pub fn begin(&mut self, pointer: Point) {
        self.last_pointer = Some(pointer);
    }

    pub fn is_active(&self) -> bool {
        self.last_pointer.is_some()
    }

    /// Moves `position` (the element's current top-left) by the pointer delta
    /// since the previous event. `None` when no drag is in progress.
    pub fn step(&mut self, pointer: Point, position: Point) -> Option<Point> {
        let last = self.last_pointer?;
        self.last_pointer = Some(pointer);
        Some(Point {
            x: position.x + (pointer.x - last.x),
            y: position.y + (pointer.y - last.y),
        })
    }

    pub fn end(&mut self) -> bool {
        self.last_pointer.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_pointer_deltas() {
        let mut drag = DragState::default();
        drag.begin(Point::new(100.0, 100.0));

        let moved = drag.step(Point::new(110.0, 95.0), Point::new(40.0, 60.0));
        assert_eq!(moved, Some(Point::new(50.0, 55.0)));

        let moved = drag.step(Point::new(120.0, 95.0), Point::new(50.0, 55.0));
        assert_eq!(moved, Some(Point::new(60.0, 55.0)));
    }

    #[test]
    fn ignores_moves_outside_a_drag() {
        let mut drag = DragState::default();
        assert_eq!(drag.step(Point::new(1.0, 1.0), Point::default()), None);
        assert!(!drag.is_active());

        drag.begin(Point::default());
        assert!(drag.end());
        assert!(!drag.end());
        assert_eq!(drag.step(Point::new(5.0, 5.0), Point::default()), None);
    }

    #[test]
    fn can_leave_the_screen() {
        let mut drag = DragState::default();
        drag.begin(Point::new(10.0, 10.0));
        let moved = drag.step(Point::new(-500.0, -500.0), Point::new(0.0, 0.0));
        assert_eq!(moved, Some(Point::new(-510.0, -510.0)));
    }
}
