//! Resolver: aggregated statistics → [`Descriptor`].
//!
//! `observations` is the number of times the enclosing context was observed
//! (0 at the top level). A slot seen fewer times than its context is absent
//! from some siblings, which is what `optional` reports. A slot that was ever
//! falsy (`0`, `""`, `[]`, ...) is not reported optional for the scalar and
//! array shapes, since an absent value and a falsy one render the same under
//! most omit-empty conventions.
use serde::Serialize;

use crate::ident;
use crate::inference::Stats;
use crate::ir::{Capabilities, Capability, Descriptor, Field, Shape};

/// How the `optional` flag of object fields is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OmitEmpty {
    /// Fields are never optional.
    Never,
    /// Fields are always optional.
    Always,
    /// Fields are optional when inferred so.
    #[default]
    Auto,
}

#[derive(Clone, Debug, Default)]
pub struct LowerOptions {
    /// Collapse objects with any unusable property name into a map.
    pub map_fallback: bool,
    pub omit_empty: OmitEmpty,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Lowered {
    pub descriptor: Descriptor,
    pub capabilities: Capabilities,
}

pub fn lower(stats: &Stats, observations: u64, options: &LowerOptions) -> Lowered {
    let mut cx = Lowerer { options, capabilities: Capabilities::new() };
    let descriptor = cx.lower(stats, observations);
    Lowered { descriptor, capabilities: cx.capabilities }
}

struct Lowerer<'a> {
    options: &'a LowerOptions,
    capabilities: Capabilities,
}

impl Lowerer<'_> {
    fn lower(&mut self, v: &Stats, observations: u64) -> Descriptor {
        let kinds = v.distinct_kinds();
        let alone = |count: u64| kinds == 1 && count > 0;
        let with_null = |count: u64| kinds == 2 && count > 0 && v.nulls > 0;
        // absent from some siblings, and never falsy when present
        let omitted = |count: u64| count < observations && v.empties == 0;

        let d = if alone(v.arrays) || with_null(v.arrays) {
            self.capabilities.insert(Capability::Sequence);
            let element = self.lower_child(v.element(), 0);
            Descriptor::new(Shape::Array { element: Box::new(element) })
                .nullable(v.nulls > 0)
                .optional(omitted(v.arrays + v.nulls))
        } else if alone(v.bools) {
            Descriptor::new(Shape::Bool).optional(omitted(v.bools))
        } else if with_null(v.bools) {
            Descriptor::new(Shape::Bool).nullable(true)
        } else if alone(v.floats) {
            Descriptor::new(Shape::Float).optional(omitted(v.floats))
        } else if with_null(v.floats) {
            Descriptor::new(Shape::Float).nullable(true)
        } else if alone(v.ints) {
            Descriptor::new(Shape::Int).optional(omitted(v.ints))
        } else if with_null(v.ints) {
            Descriptor::new(Shape::Int).nullable(true)
        } else if kinds == 2 && v.floats > 0 && v.ints > 0 {
            self.capabilities.insert(Capability::AmbiguousNumber);
            Descriptor::new(Shape::AmbiguousNumber).optional(omitted(v.floats + v.ints))
        } else if kinds == 3 && v.floats > 0 && v.ints > 0 && v.nulls > 0 {
            self.capabilities.insert(Capability::AmbiguousNumber);
            Descriptor::new(Shape::AmbiguousNumber).nullable(true)
        } else if alone(v.objects) || with_null(v.objects) {
            self.lower_object(v, observations)
        } else if alone(v.strings) {
            match v.timestamp_format() {
                Some(format) => {
                    self.capabilities.insert(Capability::Timestamp(format));
                    Descriptor::new(Shape::Timestamp { format }).optional(v.times < observations)
                }
                None => Descriptor::new(Shape::String).optional(omitted(v.strings)),
            }
        } else if with_null(v.strings) {
            match v.timestamp_format() {
                Some(format) => {
                    self.capabilities.insert(Capability::Timestamp(format));
                    Descriptor::new(Shape::Timestamp { format }).nullable(true)
                }
                None => Descriptor::new(Shape::String).nullable(true),
            }
        } else {
            self.capabilities.insert(Capability::Dynamic);
            Descriptor::new(Shape::Any)
                .nullable(v.nulls > 0)
                .optional(v.observations() < observations)
        };

        tracing::trace!(
            kinds,
            observations,
            nullable = d.nullable,
            optional = d.optional,
            "resolved {}",
            d.shape.kind()
        );
        d
    }

    /// Lazily allocated children may be missing; resolve those as a slot
    /// that was never observed.
    fn lower_child(&mut self, child: Option<&Stats>, observations: u64) -> Descriptor {
        match child {
            Some(child) => self.lower(child, observations),
            None => self.lower(&Stats::new(), observations),
        }
    }

    fn lower_object(&mut self, v: &Stats, observations: u64) -> Descriptor {
        let has_nulls = v.nulls > 0;

        if v.properties.is_empty() {
            let (nullable, optional) = if observations == 0 && !has_nulls {
                (false, false)
            } else if has_nulls {
                (true, false)
            } else if v.objects == observations {
                (false, false)
            } else {
                let absent = v.objects < observations;
                (absent, absent)
            };
            return Descriptor::new(Shape::EmptyObject).nullable(nullable).optional(optional);
        }

        let has_unusable = v.properties.keys().any(|name| !ident::is_usable(name));
        if has_unusable && self.options.map_fallback {
            self.capabilities.insert(Capability::Mapping);
            let value = self.lower_child(v.all_properties(), 0);
            return Descriptor::new(Shape::Map { value: Box::new(value) })
                .nullable(has_nulls)
                .optional(v.objects + v.nulls < observations);
        }

        let mut fields = Vec::with_capacity(v.properties.len());
        // BTreeMap iteration keeps fields sorted by name
        for (name, child) in &v.properties {
            let mut descriptor = self.lower(child, v.objects);
            match self.options.omit_empty {
                OmitEmpty::Never => descriptor.optional = false,
                OmitEmpty::Always => descriptor.optional = true,
                OmitEmpty::Auto => {}
            }
            let undeclarable = !ident::is_usable(name);
            if undeclarable {
                self.capabilities.insert(Capability::Undeclarable);
            }
            fields.push(Field { name: name.clone(), descriptor, undeclarable });
        }

        let optional = if observations == 0 || v.objects == observations {
            false
        } else if v.objects < observations && !has_nulls {
            // present-or-absent but never null still reports optional
            true
        } else {
            v.objects + v.nulls < observations
        };
        Descriptor::new(Shape::Object { fields }).nullable(has_nulls).optional(optional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{infer_from_values, TimestampFormat};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn resolve(samples: &[Value]) -> Descriptor {
        resolve_with(samples, &LowerOptions::default())
    }

    fn resolve_with(samples: &[Value], options: &LowerOptions) -> Descriptor {
        lower(&infer_from_values(samples), 0, options).descriptor
    }

    fn siblings(samples: &[Value], observations: u64) -> Descriptor {
        lower(&infer_from_values(samples), observations, &LowerOptions::default()).descriptor
    }

    fn field<'a>(d: &'a Descriptor, name: &str) -> &'a Descriptor {
        &d.field(name).unwrap_or_else(|| panic!("missing field {name}")).descriptor
    }

    #[test]
    fn nullable_int_is_never_optional() {
        for samples in [
            [json!(42), json!(43), json!(null)],
            [json!(null), json!(43), json!(42)],
            [json!(43), json!(null), json!(42)],
        ] {
            assert_eq!(siblings(&samples, 3), Descriptor::new(Shape::Int).nullable(true));
        }
    }

    #[test]
    fn fields_absent_from_some_objects_are_optional() {
        let d = resolve(&[json!({"a": 1}), json!({"a": 2, "b": "x"})]);
        assert_eq!(
            d,
            Descriptor::new(Shape::Object {
                fields: vec![
                    Field { name: "a".into(), descriptor: Descriptor::new(Shape::Int), undeclarable: false },
                    Field {
                        name: "b".into(),
                        descriptor: Descriptor::new(Shape::String).optional(true),
                        undeclarable: false,
                    },
                ],
            })
        );
    }

    #[test]
    fn timestamp_streak_then_plain_string() {
        let mut samples = vec![json!("2020-01-01T00:00:00Z"), json!("2021-06-01T00:00:00Z")];
        assert_eq!(
            resolve(&samples),
            Descriptor::new(Shape::Timestamp { format: TimestampFormat::Rfc3339Nano })
        );
        samples.push(json!("hello"));
        assert_eq!(resolve(&samples), Descriptor::new(Shape::String));
    }

    #[test]
    fn strings_under_mixed_layouts_stay_timestamps() {
        let dated = Descriptor::new(Shape::Timestamp { format: TimestampFormat::DateOnly });
        assert_eq!(resolve(&[json!("2020-01-01"), json!("2020/01/02")]), dated);
        assert_eq!(resolve(&[json!("2020/01/02"), json!("2020-01-01")]), dated);
    }

    #[test]
    fn unusable_names_are_flagged_or_collapsed() {
        let samples = [json!({"foo bar": 1, "ok": 2})];

        let d = resolve(&samples);
        let fields = d.fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "foo bar");
        assert!(fields[0].undeclarable);
        assert_eq!(fields[0].descriptor, Descriptor::new(Shape::Int));
        assert_eq!(fields[1].name, "ok");
        assert!(!fields[1].undeclarable);
        assert_eq!(fields[1].descriptor, Descriptor::new(Shape::Int));

        let options = LowerOptions { map_fallback: true, ..LowerOptions::default() };
        assert_eq!(
            resolve_with(&samples, &options),
            Descriptor::new(Shape::Map { value: Box::new(Descriptor::new(Shape::Int)) })
        );
    }

    #[test]
    fn map_fallback_ignores_usable_names() {
        let options = LowerOptions { map_fallback: true, ..LowerOptions::default() };
        let d = resolve_with(&[json!({"a": 1, "b": "x"})], &options);
        assert!(matches!(d.shape, Shape::Object { .. }));
    }

    #[test]
    fn map_fallback_optionality_counts_siblings() {
        let options = LowerOptions { map_fallback: true, ..LowerOptions::default() };
        let map = Descriptor::new(Shape::Map { value: Box::new(Descriptor::new(Shape::Int)) });

        let d = resolve_with(&[json!({"m": {"a b": 1}}), json!({"m": null}), json!({})], &options);
        assert_eq!(field(&d, "m"), &map.clone().nullable(true).optional(true));

        let d = resolve_with(&[json!({"m": {"a b": 1}}), json!({})], &options);
        assert_eq!(field(&d, "m"), &map.clone().optional(true));

        let d = resolve_with(&[json!({"m": {"a b": 1}}), json!({"m": null})], &options);
        assert_eq!(field(&d, "m"), &map.clone().nullable(true));

        let d = resolve_with(&[json!({"m": {"a b": 1}}), json!({"m": {"c d": 2}})], &options);
        assert_eq!(field(&d, "m"), &map);
    }

    #[test]
    fn empty_object_alone_and_among_siblings() {
        assert_eq!(resolve(&[json!({})]), Descriptor::new(Shape::EmptyObject));

        let d = resolve(&[json!({"e": {}}), json!({"x": 1}), json!({"x": 2})]);
        let e = field(&d, "e");
        assert_eq!(e.shape, Shape::EmptyObject);
        assert!(e.optional);

        let d = resolve(&[json!({"e": {}}), json!({"e": null})]);
        assert_eq!(field(&d, "e"), &Descriptor::new(Shape::EmptyObject).nullable(true));

        let d = resolve(&[json!({"e": {}}), json!({"e": {}})]);
        assert_eq!(field(&d, "e"), &Descriptor::new(Shape::EmptyObject));
    }

    #[test]
    fn falsy_value_suppresses_optional() {
        let d = resolve(&[json!({"n": 1}), json!({"n": 2}), json!({})]);
        assert!(field(&d, "n").optional);

        let d = resolve(&[json!({"n": 0}), json!({"n": 2}), json!({})]);
        assert!(!field(&d, "n").optional);

        let d = resolve(&[json!({"s": "x"}), json!({"s": ""}), json!({})]);
        assert!(!field(&d, "s").optional);

        let d = resolve(&[json!({"b": false}), json!({})]);
        assert!(!field(&d, "b").optional);
    }

    #[test]
    fn arrays_resolve_shared_element() {
        let d = resolve(&[json!([1, 2]), json!([3])]);
        assert_eq!(d, Descriptor::new(Shape::Array { element: Box::new(Descriptor::new(Shape::Int)) }));

        let d = resolve(&[json!([1]), json!(null)]);
        assert!(d.nullable);
        assert!(!d.optional);

        let d = resolve(&[json!({"xs": [1]}), json!({})]);
        assert!(field(&d, "xs").optional);

        let d = resolve(&[json!({"xs": []}), json!({})]);
        assert!(!field(&d, "xs").optional);
    }

    #[test]
    fn only_empty_arrays_give_unknown_elements() {
        let d = resolve(&[json!([]), json!([])]);
        assert_eq!(d, Descriptor::new(Shape::Array { element: Box::new(Descriptor::new(Shape::Any)) }));
    }

    #[test]
    fn mixed_numbers_are_ambiguous() {
        assert_eq!(resolve(&[json!(1), json!(2.5)]), Descriptor::new(Shape::AmbiguousNumber));
        assert_eq!(
            resolve(&[json!(1), json!(2.5), json!(null)]),
            Descriptor::new(Shape::AmbiguousNumber).nullable(true)
        );
        let d = resolve(&[json!({"n": 1}), json!({"n": 2.5}), json!({})]);
        assert_eq!(field(&d, "n"), &Descriptor::new(Shape::AmbiguousNumber).optional(true));
    }

    #[test]
    fn scalars_with_null_are_nullable() {
        assert_eq!(resolve(&[json!(true), json!(null)]), Descriptor::new(Shape::Bool).nullable(true));
        assert_eq!(resolve(&[json!(1.5), json!(null)]), Descriptor::new(Shape::Float).nullable(true));
        assert_eq!(resolve(&[json!("x"), json!(null)]), Descriptor::new(Shape::String).nullable(true));
        assert_eq!(
            resolve(&[json!("2020-01-01"), json!(null)]),
            Descriptor::new(Shape::Timestamp { format: TimestampFormat::DateOnly }).nullable(true)
        );
    }

    #[test]
    fn timestamp_optional_ignores_empties() {
        let d = resolve(&[json!({"t": "2020-01-01"}), json!({})]);
        assert_eq!(
            field(&d, "t"),
            &Descriptor::new(Shape::Timestamp { format: TimestampFormat::DateOnly }).optional(true)
        );
    }

    #[test]
    fn incompatible_kinds_fall_back_to_any() {
        assert_eq!(resolve(&[json!(1), json!("a"), json!(true)]), Descriptor::new(Shape::Any));
        assert_eq!(resolve(&[json!(null)]), Descriptor::new(Shape::Any).nullable(true));
        assert_eq!(resolve(&[]), Descriptor::new(Shape::Any));

        let d = resolve(&[json!({"v": 1}), json!({"v": "a"}), json!({})]);
        assert_eq!(field(&d, "v"), &Descriptor::new(Shape::Any).optional(true));
    }

    #[test]
    fn struct_optionality() {
        let d = resolve(&[json!({"o": {"a": 1}}), json!({})]);
        let o = field(&d, "o");
        assert!(o.optional);
        assert!(!o.nullable);

        let d = resolve(&[json!({"o": {"a": 1}}), json!({"o": null})]);
        let o = field(&d, "o");
        assert!(!o.optional);
        assert!(o.nullable);

        let d = resolve(&[json!({"o": {"a": 1}}), json!({"o": null}), json!({})]);
        let o = field(&d, "o");
        assert!(o.optional);
        assert!(o.nullable);
    }

    #[test]
    fn nested_fields_count_parent_objects() {
        let d = resolve(&[
            json!({"o": {"a": 1, "b": 1}}),
            json!({"o": {"a": 2}}),
            json!({}),
        ]);
        let o = field(&d, "o");
        assert!(o.optional);
        assert!(!field(o, "a").optional);
        assert!(field(o, "b").optional);
    }

    #[test]
    fn omit_empty_policy_overrides_fields() {
        let samples = [json!({"a": 1, "b": 2}), json!({"a": 3})];
        let never = LowerOptions { omit_empty: OmitEmpty::Never, ..LowerOptions::default() };
        let always = LowerOptions { omit_empty: OmitEmpty::Always, ..LowerOptions::default() };
        let d = resolve_with(&samples, &never);
        assert!(!field(&d, "b").optional);
        let d = resolve_with(&samples, &always);
        assert!(field(&d, "a").optional);
        assert!(!d.optional);
    }

    #[test]
    fn capabilities_are_collected_per_call() {
        let stats = infer_from_values(&[json!({
            "tags": ["a"],
            "at": "2020/01/02",
            "n": [1, 2.5],
            "odd key": {},
            "v": [1, "x"],
        })]);
        let lowered = lower(&stats, 0, &LowerOptions::default());
        let expected: Capabilities = [
            Capability::Sequence,
            Capability::Timestamp(TimestampFormat::SlashDate),
            Capability::AmbiguousNumber,
            Capability::Undeclarable,
            Capability::Dynamic,
        ]
        .into_iter()
        .collect();
        assert_eq!(lowered.capabilities, expected);

        let again = lower(&stats, 0, &LowerOptions::default());
        assert_eq!(lowered, again);

        let options = LowerOptions { map_fallback: true, ..LowerOptions::default() };
        let mapped = lower(&stats, 0, &options);
        assert!(mapped.capabilities.contains(&Capability::Mapping));
        assert!(!mapped.capabilities.contains(&Capability::Undeclarable));
    }

    #[test]
    fn descriptor_serializes_with_kind_tag() {
        let d = resolve(&[json!({"at": "2020-01-01", "xs": [1]})]);
        let expected = json!({
            "kind": "Object",
            "nullable": false,
            "optional": false,
            "fields": [
                {
                    "name": "at",
                    "undeclarable": false,
                    "descriptor": {"kind": "Timestamp", "format": "2006-01-02", "nullable": false, "optional": false}
                },
                {
                    "name": "xs",
                    "undeclarable": false,
                    "descriptor": {
                        "kind": "Array",
                        "nullable": false,
                        "optional": false,
                        "element": {"kind": "Int", "nullable": false, "optional": false}
                    }
                }
            ]
        });
        assert_eq!(serde_json::to_value(&d).unwrap(), expected);
    }
}
