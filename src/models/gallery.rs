/// Image carousel over a listing's gallery
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gallery {
    images: Vec<String>,
    current: usize,
}

impl Gallery {
    pub fn new(images: Vec<String>) -> Self {
        Self { images, current: 0 }
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Navigation arrows and indicators are only shown for more than one image
    pub fn has_controls(&self) -> bool {
        self.images.len() > 1
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&str> {
        self.images.get(self.current).map(String::as_str)
    }

    pub fn next(&mut self) {
        if !self.images.is_empty() {
            self.current = (self.current + 1) % self.images.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.images.is_empty() {
            self.current = (self.current + self.images.len() - 1) % self.images.len();
        }
    }

    /// Jump to an indicator; out of range indices are ignored
    pub fn select(&mut self, index: usize) {
        if index < self.images.len() {
            self.current = index;
        }
    }

    /// "2 / 5" counter shown in the full-screen viewer
    pub fn counter(&self) -> String {
        format!("{} / {}", self.current + 1, self.images.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery(n: usize) -> Gallery {
        Gallery::new((0..n).map(|i| format!("{i}.jpg")).collect())
    }

    #[test]
    fn navigation_wraps_around() {
        let mut g = gallery(3);
        g.prev();
        assert_eq!(g.current(), Some("2.jpg"));
        g.next();
        assert_eq!(g.current(), Some("0.jpg"));
        g.select(1);
        assert_eq!(g.counter(), "2 / 3");
        g.select(7);
        assert_eq!(g.current_index(), 1);
    }

    #[test]
    fn empty_gallery_is_inert() {
        let mut g = gallery(0);
        g.next();
        g.prev();
        assert_eq!(g.current(), None);
        assert!(!g.has_controls());
    }
}
