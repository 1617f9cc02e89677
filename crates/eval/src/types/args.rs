//! Parameter specs and Python-style argument binding.

use super::{EvalError, Value};

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Value>,
}

/// Declared parameters of a callable: ordered names with optional
/// defaults, an optional `*rest` collector, an optional `**kwrest`
/// collector, and a boundary after which parameters are keyword-only.
#[derive(Debug, Clone, Default)]
pub struct ParamSpec {
    params: Vec<Param>,
    positional: usize,
    keyword_only: bool,
    varargs: Option<String>,
    varkw: Option<String>,
}

impl ParamSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain positional parameters, as declared by a `lambda`.
    pub fn positional<S: AsRef<str>>(names: &[S]) -> Self {
        names
            .iter()
            .fold(ParamSpec::new(), |spec, name| spec.required(name.as_ref()))
    }

    fn push(mut self, name: &str, default: Option<Value>) -> Self {
        self.params.push(Param {
            name: name.to_owned(),
            default,
        });
        if !self.keyword_only {
            self.positional = self.params.len();
        }
        self
    }

    pub fn required(self, name: &str) -> Self {
        self.push(name, None)
    }

    pub fn optional(self, name: &str, default: Value) -> Self {
        self.push(name, Some(default))
    }

    /// Parameters declared after this call can only be passed by keyword.
    pub fn keyword_only(mut self) -> Self {
        self.keyword_only = true;
        self
    }

    pub fn varargs(mut self, name: &str) -> Self {
        self.varargs = Some(name.to_owned());
        self
    }

    pub fn varkw(mut self, name: &str) -> Self {
        self.varkw = Some(name.to_owned());
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// Bind call arguments to the declared parameters.
    ///
    /// Positional arguments fill parameters left to right. A keyword naming
    /// an already filled parameter is a duplicate; other keywords fill by
    /// name. Unfilled parameters without defaults are missing. Extra
    /// positionals go to `*rest` and extra keywords to `**kwrest` when
    /// declared, and are errors otherwise.
    pub fn bind(
        &self,
        callee: &str,
        positional: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<BoundArgs<'_>, EvalError> {
        let given = positional.len();
        let mut slots: Vec<Option<Value>> = vec![None; self.params.len()];
        let mut positional = positional.into_iter();
        for slot in slots.iter_mut().take(self.positional) {
            match positional.next() {
                Some(value) => *slot = Some(value),
                None => break,
            }
        }
        let rest: Vec<Value> = positional.collect();

        let mut kwrest = Vec::new();
        for (name, value) in keywords {
            match self.index_of(&name) {
                Some(i) if slots[i].is_some() => {
                    return Err(EvalError::type_error(format!(
                        "{callee}() got multiple values for keyword argument '{name}'"
                    )));
                }
                Some(i) => slots[i] = Some(value),
                None => kwrest.push((name, value)),
            }
        }

        let values = slots
            .into_iter()
            .zip(&self.params)
            .map(|(slot, param)| {
                slot.or_else(|| param.default.clone()).ok_or_else(|| {
                    EvalError::type_error(format!(
                        "{callee}() missing required argument '{}'",
                        param.name
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !rest.is_empty() && self.varargs.is_none() {
            return Err(EvalError::type_error(format!(
                "{callee}() takes at most {} positional arguments ({given} given)",
                self.positional
            )));
        }
        if let (Some((name, _)), None) = (kwrest.first(), &self.varkw) {
            return Err(EvalError::type_error(format!(
                "{callee}() got an unexpected keyword argument '{name}'"
            )));
        }

        Ok(BoundArgs {
            spec: self,
            values,
            rest,
            kwrest,
        })
    }
}

/// Arguments bound against a [`ParamSpec`].
#[derive(Debug)]
pub struct BoundArgs<'a> {
    spec: &'a ParamSpec,
    values: Vec<Value>,
    rest: Vec<Value>,
    kwrest: Vec<(String, Value)>,
}

impl<'a> BoundArgs<'a> {
    /// Value bound to a declared parameter. Undeclared names read as `None`.
    pub fn get(&self, name: &str) -> &Value {
        const NONE: &Value = &Value::None;
        self.spec
            .index_of(name)
            .and_then(|i| self.values.get(i))
            .unwrap_or(NONE)
    }

    /// Whether the parameter was bound to something other than `None`.
    pub fn is_set(&self, name: &str) -> bool {
        !self.get(name).is_none()
    }

    pub fn rest(&self) -> &[Value] {
        &self.rest
    }

    pub fn kwrest(&self) -> &[(String, Value)] {
        &self.kwrest
    }

    /// Declared parameter names paired with their bound values.
    pub fn named(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.spec
            .params
            .iter()
            .map(|p| p.name.as_str())
            .zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(v: &Value) -> f64 {
        v.as_float().unwrap()
    }

    #[test]
    fn positional_then_keywords_then_defaults() {
        let spec = ParamSpec::new()
            .required("a")
            .required("b")
            .optional("c", Value::int(3));
        let bound = spec
            .bind("f", vec![Value::int(1)], vec![("b".into(), Value::int(2))])
            .unwrap();
        assert_eq!(float(bound.get("a")), 1.0);
        assert_eq!(float(bound.get("b")), 2.0);
        assert_eq!(float(bound.get("c")), 3.0);
    }

    #[test]
    fn duplicate_argument() {
        let spec = ParamSpec::new().required("a");
        let err = spec
            .bind("f", vec![Value::int(1)], vec![("a".into(), Value::int(2))])
            .unwrap_err();
        assert!(err.to_string().contains("multiple values"), "{err}");
    }

    #[test]
    fn missing_argument() {
        let spec = ParamSpec::new().required("a").required("b");
        let err = spec.bind("f", vec![Value::int(1)], vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: f() missing required argument 'b'"
        );
    }

    #[test]
    fn overfill_without_rest_is_too_many() {
        let spec = ParamSpec::new().optional("a", Value::None).varkw("kw");
        let err = spec
            .bind("f", vec![Value::int(1), Value::int(2)], vec![])
            .unwrap_err();
        assert!(err.to_string().contains("takes at most 1"), "{err}");
    }

    #[test]
    fn rest_collectors() {
        let spec = ParamSpec::new()
            .required("a")
            .varargs("args")
            .varkw("kw");
        let bound = spec
            .bind(
                "f",
                vec![Value::int(1), Value::int(2), Value::int(3)],
                vec![("z".into(), Value::int(4))],
            )
            .unwrap();
        assert_eq!(bound.rest().len(), 2);
        assert_eq!(bound.kwrest()[0].0, "z");
    }

    #[test]
    fn unknown_keyword_without_kwrest() {
        let spec = ParamSpec::new().optional("a", Value::None);
        let err = spec
            .bind("f", vec![], vec![("zz".into(), Value::int(1))])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: f() got an unexpected keyword argument 'zz'"
        );
    }

    #[test]
    fn keyword_only_parameters_skip_positionals() {
        let spec = ParamSpec::new().keyword_only().optional("years", Value::int(0));
        assert!(spec.bind("relativedelta", vec![Value::int(1)], vec![]).is_err());
        let bound = spec
            .bind("relativedelta", vec![], vec![("years".into(), Value::int(2))])
            .unwrap();
        assert_eq!(float(bound.get("years")), 2.0);
    }
}
