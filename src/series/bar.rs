use super::{axis_totals, base_dataset, category_points, normalise_to_percent, SeriesBuilderProps, SeriesStrategy};
use crate::config::BarGroupType;
use crate::ir::{AxisId, BuiltSeries, ChartDataset, DatasetKind, DatasetOption};

pub const STACK_TOTAL_ID: &str = "stackTotal";

pub struct BarSeries;

impl SeriesStrategy for BarSeries {
    fn build(&self, props: &SeriesBuilderProps<'_>) -> BuiltSeries {
        let options = props.dataset_options;
        let percent = props.bar_group_type == BarGroupType::PercentageStack;
        let totals_y = axis_totals(props, AxisId::Y);
        let totals_y2 = axis_totals(props, AxisId::Y2);

        let mut next_slot = 0;
        let datasets = options
            .datasets
            .iter()
            .enumerate()
            .map(|(index, option)| {
                let slot = props.is_visible(&option.data_key).then(|| {
                    next_slot += 1;
                    next_slot - 1
                });
                let values = if percent {
                    let totals = if option.axis == AxisId::Y { &totals_y } else { &totals_y2 };
                    normalise_to_percent(&option.data, totals)
                } else {
                    option.data.clone()
                };
                base_dataset(
                    props,
                    index,
                    option,
                    category_points(options, &values),
                    bar_kind(props, option, slot),
                )
            })
            .collect();

        BuiltSeries {
            datasets,
            total: stack_total(props),
        }
    }
}

/// Bar fields for one series. Stacked modes share one stack per axis;
/// grouped bars each get their own stack and a slot among visible bars.
pub(super) fn bar_kind(props: &SeriesBuilderProps<'_>, option: &DatasetOption, slot: Option<usize>) -> DatasetKind {
    let settings = props.settings(&option.data_key);
    let group = props.bar_group_type;
    let stack = match group {
        BarGroupType::Group => option.data_key.clone(),
        BarGroupType::Stack | BarGroupType::PercentageStack => format!("stack-{}", option.axis.as_str()),
    };
    DatasetKind::Bar {
        stack,
        offset: if group == BarGroupType::Group { slot } else { None },
        border_radius: settings.bar_roundness / 2.0,
        percentage: group == BarGroupType::PercentageStack
            || (group == BarGroupType::Stack && settings.show_data_labels_as_percentage),
    }
}

/// Label-only total above each stack of visible y-axis bars. Only drawn for
/// stacked bars with more than one series.
fn stack_total(props: &SeriesBuilderProps<'_>) -> Option<ChartDataset> {
    if !props.bar_show_total_at_top || !props.bar_group_type.is_stacked() {
        return None;
    }
    if props.y_axis_keys.len() <= 1 && props.y2_axis_keys.is_empty() {
        return None;
    }

    let options = props.dataset_options;
    let stacked: Vec<&DatasetOption> = options
        .datasets
        .iter()
        .filter(|d| d.axis == AxisId::Y && props.is_visible(&d.data_key))
        .collect();
    if stacked.is_empty() {
        return None;
    }

    let totals: Vec<Option<f64>> = (0..options.point_count())
        .map(|i| {
            stacked
                .iter()
                .filter_map(|d| d.data[i])
                .fold(None, |acc: Option<f64>, v| Some(acc.unwrap_or(0.0) + v))
        })
        .collect();

    Some(ChartDataset {
        id: STACK_TOTAL_ID.to_string(),
        label: "Total".to_string(),
        y_axis_key: STACK_TOTAL_ID.to_string(),
        y_axis_id: AxisId::Y,
        data: category_points(options, &totals),
        color: "transparent".to_string(),
        colors: Vec::new(),
        tooltip_data: Vec::new(),
        order: options.datasets.len(),
        hidden: false,
        show_data_labels: true,
        categories: None,
        kind: DatasetKind::StackTotal {
            stack: format!("stack-{}", AxisId::Y.as_str()),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChartType, ColumnSettings};
    use crate::series::build_series;
    use crate::series::tests::{option, options, Fixture};
    use pretty_assertions::assert_eq;

    fn two_series() -> Fixture {
        Fixture::new(
            options(
                &["a", "b"],
                vec![
                    option("m", AxisId::Y, vec![Some(1.0), Some(2.0)]),
                    option("n", AxisId::Y, vec![Some(3.0), None]),
                ],
            ),
            &["m", "n"],
            &[],
        )
    }

    fn stacks(built: &BuiltSeries) -> Vec<String> {
        built
            .datasets
            .iter()
            .map(|d| match &d.kind {
                DatasetKind::Bar { stack, .. } => stack.clone(),
                other => panic!("unexpected kind {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_stacked_share_stack_and_total() {
        let fixture = two_series();
        let props = SeriesBuilderProps {
            bar_group_type: BarGroupType::Stack,
            bar_show_total_at_top: true,
            ..fixture.props()
        };
        let built = build_series(ChartType::Bar, &props).unwrap();
        assert_eq!(stacks(&built), vec!["stack-y", "stack-y"]);

        let total = built.total.unwrap();
        assert_eq!(total.data.iter().map(|p| p.y).collect::<Vec<_>>(), vec![Some(4.0), Some(2.0)]);
        assert!(matches!(total.kind, DatasetKind::StackTotal { .. }));
    }

    #[test]
    fn test_grouped_offsets_skip_hidden() {
        let mut fixture = Fixture::new(
            options(
                &["a"],
                vec![
                    option("m", AxisId::Y, vec![Some(1.0)]),
                    option("h", AxisId::Y, vec![Some(1.0)]),
                    option("n", AxisId::Y, vec![Some(1.0)]),
                ],
            ),
            &["m", "h", "n"],
            &[],
        );
        fixture.settings.insert(
            "h".to_string(),
            ColumnSettings { show: false, ..ColumnSettings::DEFAULT },
        );
        let built = build_series(ChartType::Bar, &fixture.props()).unwrap();
        assert_eq!(stacks(&built), vec!["m", "h", "n"]);
        let offsets: Vec<Option<usize>> = built
            .datasets
            .iter()
            .map(|d| match &d.kind {
                DatasetKind::Bar { offset, .. } => *offset,
                _ => None,
            })
            .collect();
        assert_eq!(offsets, vec![Some(0), None, Some(1)]);
        assert!(built.total.is_none());
    }

    #[test]
    fn test_total_requires_multiple_series() {
        let fixture = Fixture::new(
            options(&["a"], vec![option("m", AxisId::Y, vec![Some(1.0)])]),
            &["m"],
            &[],
        );
        let props = SeriesBuilderProps {
            bar_group_type: BarGroupType::Stack,
            bar_show_total_at_top: true,
            ..fixture.props()
        };
        assert!(build_series(ChartType::Bar, &props).unwrap().total.is_none());
    }

    #[test]
    fn test_percentage_stack_normalises_per_axis() {
        let fixture = two_series();
        let props = SeriesBuilderProps {
            bar_group_type: BarGroupType::PercentageStack,
            ..fixture.props()
        };
        let built = build_series(ChartType::Bar, &props).unwrap();
        let m: Vec<Option<f64>> = built.datasets[0].data.iter().map(|p| p.y).collect();
        let n: Vec<Option<f64>> = built.datasets[1].data.iter().map(|p| p.y).collect();
        assert_eq!(m, vec![Some(25.0), Some(100.0)]);
        assert_eq!(n, vec![Some(75.0), None]);
        assert!(matches!(built.datasets[0].kind, DatasetKind::Bar { percentage: true, .. }));
    }

    #[test]
    fn test_y2_stacks_separately_and_border_radius() {
        let mut fixture = Fixture::new(
            options(
                &["a"],
                vec![option("m", AxisId::Y, vec![Some(1.0)]), option("r", AxisId::Y2, vec![Some(0.5)])],
            ),
            &["m"],
            &["r"],
        );
        fixture.settings.insert(
            "m".to_string(),
            ColumnSettings { bar_roundness: 20.0, ..ColumnSettings::DEFAULT },
        );
        let props = SeriesBuilderProps {
            bar_group_type: BarGroupType::Stack,
            ..fixture.props()
        };
        let built = build_series(ChartType::Bar, &props).unwrap();
        assert_eq!(stacks(&built), vec!["stack-y", "stack-y2"]);
        assert!(matches!(built.datasets[0].kind, DatasetKind::Bar { border_radius, .. } if border_radius == 10.0));
        assert_eq!(built.datasets[1].y_axis_id, AxisId::Y2);
    }
}
