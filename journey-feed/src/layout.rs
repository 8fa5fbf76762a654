//! Раскладка сетки изображений поста.
//!
//! Раскладка — декларативная таблица по количеству изображений (1..=6);
//! всё, что больше, получает шаблон 6+ со счётчиком скрытых ("+N").

use journey_client::PostImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Шаблон сетки для заданного количества изображений.
pub struct GridTemplate {
    /// Количество колонок.
    pub columns: u32,
    /// Сколько ячеек показывается.
    pub visible: usize,
    /// Сколько колонок занимает первая, акцентная ячейка.
    pub lead_span: u32,
}

const TEMPLATES: [GridTemplate; 6] = [
    // 1: одно изображение на всю ширину, со своим соотношением сторон
    GridTemplate {
        columns: 1,
        visible: 1,
        lead_span: 1,
    },
    // 2: две квадратные ячейки
    GridTemplate {
        columns: 2,
        visible: 2,
        lead_span: 1,
    },
    // 3: три в ряд
    GridTemplate {
        columns: 3,
        visible: 3,
        lead_span: 1,
    },
    // 4: квадрат 2x2
    GridTemplate {
        columns: 2,
        visible: 4,
        lead_span: 1,
    },
    // 5: акцентная ячейка на всю ширину + ряд из четырёх под ней
    GridTemplate {
        columns: 4,
        visible: 5,
        lead_span: 4,
    },
    // 6+: сетка 3xN, лишнее прячется за "+N"
    GridTemplate {
        columns: 3,
        visible: 6,
        lead_span: 1,
    },
];

/// Шаблон сетки для количества изображений; `None` для поста без картинок.
pub fn grid_template(count: usize) -> Option<GridTemplate> {
    if count == 0 {
        return None;
    }
    Some(TEMPLATES[count.min(TEMPLATES.len()) - 1])
}

/// Сколько изображений скрыто за значком "+N".
pub fn hidden_count(count: usize) -> usize {
    match grid_template(count) {
        Some(template) => count.saturating_sub(template.visible),
        None => 0,
    }
}

/// Соотношение сторон ячейки: из размеров изображения или квадрат, пока
/// размеры неизвестны.
pub fn cell_aspect(image: &PostImage) -> f64 {
    image.aspect_ratio().unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_template_for_empty_gallery() {
        assert!(grid_template(0).is_none());
        assert_eq!(hidden_count(0), 0);
    }

    #[test]
    fn enumerated_counts_use_their_own_templates() {
        assert_eq!(grid_template(1).map(|t| t.columns), Some(1));
        assert_eq!(grid_template(2).map(|t| t.columns), Some(2));
        assert_eq!(grid_template(3).map(|t| t.columns), Some(3));
        assert_eq!(grid_template(4).map(|t| t.columns), Some(2));
        assert_eq!(grid_template(5).map(|t| t.lead_span), Some(4));
    }

    #[test]
    fn counts_above_table_default_to_last_template() {
        let six = grid_template(6).expect("template for 6");
        let nine = grid_template(9).expect("template for 9");
        assert_eq!(six, nine);

        assert_eq!(hidden_count(6), 0);
        assert_eq!(hidden_count(9), 3);
    }

    #[test]
    fn cell_aspect_falls_back_to_square() {
        let image = PostImage {
            id: "i1".to_string(),
            url: "https://cdn.example.com/i1.jpg".to_string(),
            width: None,
            height: None,
            blurhash: Some("LEHV6nWB2yk8pyo0adR*.7kCMdnj".to_string()),
            content_type: None,
            name: None,
        };
        assert_eq!(cell_aspect(&image), 1.0);
    }
}
