use super::payload::{Payload, PayloadType};
use super::{Operation, OperationResult, Options};
use crate::element::{Element, ElementSeed};
use std::any::Any;
use std::sync::Arc;

/// One input item of a [`ForEach`]
#[derive(Debug, Clone, PartialEq)]
pub enum ForEachItem {
    Seed(ElementSeed),
    Element(Element),
}

impl ForEachItem {
    /// Single-item payload fed to the delegate
    pub fn to_payload(&self) -> Payload {
        match self {
            ForEachItem::Seed(seed) => Payload::Seeds(vec![seed.clone()]),
            ForEachItem::Element(element) => Payload::from(vec![element.clone()]),
        }
    }
}

/// Run a delegate operation once per input item, collecting the outputs
#[derive(Debug)]
pub struct ForEach {
    pub operation: Box<dyn Operation>,
    pub input: Arc<Vec<ForEachItem>>,
    pub options: Options,
}

impl ForEach {
    pub fn new(operation: Box<dyn Operation>) -> Self {
        ForEach {
            operation,
            input: Arc::new(Vec::new()),
            options: Options::new(),
        }
    }

    pub fn with_input(mut self, items: Vec<ForEachItem>) -> Self {
        self.input = Arc::new(items);
        self
    }

    /// Delegate copy carrying `item` as its input
    pub fn delegate_for(&self, item: &ForEachItem) -> OperationResult<Box<dyn Operation>> {
        let mut delegate = self.operation.shallow_clone();
        delegate.set_input(item.to_payload())?;
        Ok(delegate)
    }
}

impl Clone for ForEach {
    fn clone(&self) -> Self {
        ForEach {
            operation: self.operation.shallow_clone(),
            input: Arc::clone(&self.input),
            options: self.options.clone(),
        }
    }
}

impl Operation for ForEach {
    fn class(&self) -> &'static str {
        "ForEach"
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    fn input_type(&self) -> PayloadType {
        PayloadType::Any
    }

    fn output_type(&self) -> PayloadType {
        PayloadType::List
    }

    fn set_input(&mut self, input: Payload) -> OperationResult<()> {
        let items = match input {
            Payload::Seeds(seeds) => seeds.into_iter().map(ForEachItem::Seed).collect(),
            Payload::Elements(stream) => stream
                .collect_all()?
                .into_iter()
                .map(ForEachItem::Element)
                .collect(),
            Payload::Empty => Vec::new(),
            other => return Err(self.invalid_input(&other)),
        };
        self.input = Arc::new(items);
        Ok(())
    }

    fn shallow_clone(&self) -> Box<dyn Operation> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Count, GetElements};

    #[test]
    fn test_delegate_receives_single_item() {
        let for_each = ForEach::new(Box::new(GetElements::new(vec![]))).with_input(vec![
            ForEachItem::Seed(ElementSeed::entity("A")),
            ForEachItem::Seed(ElementSeed::entity("B")),
        ]);
        let delegate = for_each.delegate_for(&for_each.input[1]).unwrap();
        let get = delegate.as_any().downcast_ref::<GetElements>().unwrap();
        assert_eq!(*get.input, vec![ElementSeed::entity("B")]);
        // the template is untouched
        let template = for_each.operation.as_any().downcast_ref::<GetElements>().unwrap();
        assert!(template.input.is_empty());
    }

    #[test]
    fn test_rejects_item_the_delegate_cannot_take() {
        let for_each = ForEach::new(Box::new(Count::new()));
        let item = ForEachItem::Seed(ElementSeed::entity("A"));
        assert!(for_each.delegate_for(&item).is_err());
    }
}
