//! Ratatui widget that draws the engine's viewport: one terminal line per
//! offset unit, rows from whichever slot holds their page, placeholders for
//! rows that have nothing to show, and a spinner at each loading indicator.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::app::engine::{RowView, VirtualList};

use super::spinner::PageSpinner;
use super::theme::Theme;

/// Title line and detail line for one item.
pub type Describe<T> = fn(&T) -> (String, String);

/// Created fresh each frame.
pub struct ListWidget<'a, T> {
    list: &'a VirtualList<T>,
    describe: Describe<T>,
    tick: u64,
    block: Option<Block<'a>>,
}

impl<'a, T: Clone + Send + Sync + 'static> ListWidget<'a, T> {
    pub fn new(list: &'a VirtualList<T>, describe: Describe<T>) -> Self {
        Self {
            list,
            describe,
            tick: 0,
            block: None,
        }
    }

    pub fn tick(mut self, tick: u64) -> Self {
        self.tick = tick;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn row_line(&self, row: &RowView<'_, T>, line_in_item: usize, width: usize) -> Line<'static> {
        let number = Span::styled(format!("{:>7} ", row.index + 1), Theme::row_number_style());
        match (row.item, line_in_item) {
            (Some(item), 0) => {
                let (title, _) = (self.describe)(item);
                Line::from(vec![number, Span::styled(title, Theme::item_style())])
            }
            (Some(item), 1) => {
                let (_, detail) = (self.describe)(item);
                Line::from(Span::styled(format!("{:8}{detail}", ""), Theme::detail_style()))
            }
            (None, 0) => {
                let filler = if row.loading { "…" } else { "—" };
                let bar = filler.repeat(width.saturating_sub(8).min(24));
                Line::from(vec![number, Span::styled(bar, Theme::placeholder_style())])
            }
            _ => Line::default(),
        }
    }
}

impl<'a, T: Clone + Send + Sync + 'static> Widget for ListWidget<'a, T> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(ref block) = self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let mapper = self.list.mapper();
        let offset = self.list.current_offset();
        let item_height = mapper.item_height();

        for y in 0..inner.height {
            let within = offset + f64::from(y) - mapper.header_offset();
            if within < 0.0 {
                continue;
            }
            let index = (within / item_height).floor() as usize;
            let Some(row) = self.list.row(index) else {
                break;
            };
            let line_in_item = (within - index as f64 * item_height).floor() as usize;
            let line = self.row_line(&row, line_in_item, inner.width as usize);
            buf.set_line(inner.x, inner.y + y, &line, inner.width);

            // Page boundaries get a rule on the right edge.
            if line_in_item == 0 && index % mapper.page_size() == 0 && inner.width > 12 {
                let label = format!("p{}", mapper.page_of_item(index));
                let x = inner.x + inner.width - label.len() as u16;
                buf.set_string(x, inner.y + y, label, Theme::page_rule_style());
            }
        }

        for indicator in self.list.indicators() {
            let Some(page) = indicator.page else {
                continue;
            };
            let row = (indicator.center - offset).floor();
            if row < 0.0 || row >= f64::from(inner.height) {
                continue;
            }
            let line = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
            PageSpinner {
                page,
                tick: self.tick,
            }
            .render(line, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use tokio::sync::mpsc;

    use super::*;
    use crate::app::fetcher::FetchCompletion;
    use crate::app::source::PageSource;
    use crate::config::ListConfig;

    struct Words;

    impl PageSource for Words {
        type Item = usize;

        fn request_page(
            &self,
            page: usize,
            page_size: usize,
        ) -> BoxFuture<'static, anyhow::Result<Vec<usize>>> {
            let start = (page - 1) * page_size;
            async move {
                let rows: Vec<usize> = (start..start + page_size).collect();
                Ok(rows)
            }
            .boxed()
        }
    }

    fn describe(n: &usize) -> (String, String) {
        (format!("word {n}"), format!("{} digits", n.to_string().len()))
    }

    fn screen(buf: &Buffer, area: Rect) -> Vec<String> {
        (0..area.height)
            .map(|y| (0..area.width).map(|x| buf[(x, y)].symbol().to_string()).collect())
            .collect()
    }

    #[tokio::test]
    async fn draws_spinner_then_rows() {
        let (tx, mut rx) = mpsc::unbounded_channel::<FetchCompletion<usize>>();
        let mut config = ListConfig::new(100, 2.0);
        config.page_size = 10;
        let mut list =
            VirtualList::new(config, "words", Arc::new(Words), tx).expect("valid config");
        list.set_viewport_height(40.0);
        list.watchdog_tick();

        // Nothing loaded yet: placeholders plus a spinner mid-page.
        let area = Rect::new(0, 0, 40, 40);
        let mut buf = Buffer::empty(area);
        ListWidget::new(&list, describe).render(area, &mut buf);
        let lines = screen(&buf, area);
        assert!(lines[0].contains('…'));
        assert!(lines[10].contains("loading page 1"));

        while let Ok(Some(completion)) =
            tokio::time::timeout(std::time::Duration::from_millis(200), rx.recv()).await
        {
            list.apply_completion(completion);
        }

        let mut buf = Buffer::empty(area);
        ListWidget::new(&list, describe).render(area, &mut buf);
        let lines = screen(&buf, area);
        assert!(lines[0].contains("word 0"));
        assert!(lines[0].ends_with("p1"));
        assert!(lines[1].contains("1 digits"));
        assert!(lines[20].contains("word 10"));
        assert!(!lines.iter().any(|l| l.contains("loading")));
    }
}
