use crate::notify::{Notice, NoticeListener};

/// Wraps a listener and only forwards notices matching a predicate.
///
/// Use this when [`NoticeFilter`](crate::notify::NoticeFilter) is not expressive
/// enough, e.g. a predicate that captures state.
pub struct FilteredListener {
    predicate: Box<dyn Fn(&Notice) -> bool + Send + Sync>,
    inner: Box<dyn NoticeListener>,
}

impl FilteredListener {
    pub fn new(
        predicate: impl Fn(&Notice) -> bool + Send + Sync + 'static,
        inner: impl NoticeListener + 'static,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            inner: Box::new(inner),
        }
    }

    /// Forwards only rejections that carry the permitted combinations.
    pub fn whitelist_hints(inner: impl NoticeListener + 'static) -> Self {
        Self::new(|notice| notice.allowed.is_some(), inner)
    }
}

impl NoticeListener for FilteredListener {
    fn on_notice(&mut self, notice: &Notice) {
        if (self.predicate)(notice) {
            self.inner.on_notice(notice);
        }
    }
}
