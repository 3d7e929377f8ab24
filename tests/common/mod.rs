//! A TensorFlow `dynamic_rnn` loop as tf2onnx lowers it, plus the loop
//! region a loop-extraction step reports for it.

#![allow(dead_code)]

use rnn_scan_rewriter::loops::{CellGraph, LoopContext, LoopProperties, LoopVariable, ScanInput, TensorValueInfo};
use rnn_scan_rewriter::proto::extensions::{make_node, make_tensor_value_info};
use rnn_scan_rewriter::proto::{AttributeProto, GraphProto, NodeProto, TensorProto};

pub const WHILE_SCOPE: &str = "rnn/while/";
pub const OUTPUT_TA_NAME: &str = "rnn/dynamic_rnn/output_0";

pub const STATE_EXIT: &str = "rnn/while/Exit_2:0";
pub const SEQUENCE_EXIT: &str = "rnn/TensorArrayStack/TensorArrayGatherV3:0";

/// Knobs for the fixture
#[derive(Debug, Clone)]
pub struct RnnFixture {
    /// `tensor_array_name` of the output accumulator
    pub output_ta_name: String,
    /// Shape of the full input sequence `x`
    pub input_shape: Vec<i64>,
    /// Declare the state exit itself as graph output instead of going
    /// through `h_final`
    pub state_exit_is_graph_output: bool,
}

impl Default for RnnFixture {
    fn default() -> Self {
        Self {
            output_ta_name: OUTPUT_TA_NAME.to_string(),
            input_shape: vec![5, 4],
            state_exit_is_graph_output: false,
        }
    }
}

fn node(op: &str, inputs: &[&str], name: &str) -> NodeProto {
    let output = format!("{}:0", name);
    make_node(op, inputs, &[output.as_str()], name)
}

fn tensor_array(name: &str, ta_name: &str) -> NodeProto {
    let handle = format!("{}:0", name);
    let flow = format!("{}:1", name);
    let mut ta = make_node("TensorArrayV3", &["rnn/n:0"], &[handle.as_str(), flow.as_str()], name);
    ta.attribute.push(AttributeProto::new_string("tensor_array_name", ta_name));
    ta
}

fn info(id: &str) -> TensorValueInfo {
    TensorValueInfo::new(id, Some(vec![4]), Some(1))
}

impl RnnFixture {
    pub fn build(&self) -> (GraphProto, LoopContext) {
        (self.graph(), self.region())
    }

    pub fn graph(&self) -> GraphProto {
        let mut nodes = vec![
            node("Constant", &[], "rnn/time"),
            node("Constant", &[], "rnn/n"),
            tensor_array("rnn/TensorArray", &self.output_ta_name),
            tensor_array("rnn/TensorArray_1", "rnn/dynamic_rnn/input_0"),
            node(
                "TensorArrayScatterV3",
                &["rnn/TensorArray_1:0", "rnn/n:0", "x", "rnn/TensorArray_1:1"],
                "rnn/TensorArrayUnstack/TensorArrayScatter",
            ),
            // loop entry
            node("Enter", &["rnn/time:0"], "rnn/while/Enter"),
            node("Enter", &["rnn/TensorArray:1"], "rnn/while/Enter_1"),
            node("Enter", &["h0"], "rnn/while/Enter_2"),
            node("Enter", &["rnn/TensorArray_1:0"], "rnn/while/Enter_3"),
            node("Enter", &["rnn/TensorArrayUnstack/TensorArrayScatter:0"], "rnn/while/Enter_4"),
            node("Enter", &["rnn/TensorArray:0"], "rnn/while/Enter_5"),
            node("Enter", &["rnn/n:0"], "rnn/while/Enter_6"),
            node("Merge", &["rnn/while/Enter:0", "rnn/while/NextIteration:0"], "rnn/while/Merge"),
            node("Merge", &["rnn/while/Enter_1:0", "rnn/while/NextIteration_1:0"], "rnn/while/Merge_1"),
            node("Merge", &["rnn/while/Enter_2:0", "rnn/while/NextIteration_2:0"], "rnn/while/Merge_2"),
            node("Less", &["rnn/while/Merge:0", "rnn/while/Enter_6:0"], "rnn/while/Less"),
            node("LoopCond", &["rnn/while/Less:0"], "rnn/while/LoopCond"),
        ];

        for suffix in ["", "_1", "_2"] {
            let name = format!("rnn/while/Switch{}", suffix);
            let merged = format!("rnn/while/Merge{}:0", suffix);
            let outputs = [format!("{}:0", name), format!("{}:1", name)];
            nodes.push(make_node(
                "Switch",
                &[merged.as_str(), "rnn/while/LoopCond:0"],
                &[outputs[0].as_str(), outputs[1].as_str()],
                &name,
            ));
            let taken = format!("{}:1", name);
            nodes.push(node("Identity", &[taken.as_str()], &format!("rnn/while/Identity{}", suffix)));
        }

        nodes.extend([
            node(
                "TensorArrayReadV3",
                &["rnn/while/Enter_3:0", "rnn/while/Identity:0", "rnn/while/Enter_4:0"],
                "rnn/while/TensorArrayReadV3",
            ),
            // cell
            node("Add", &["rnn/while/TensorArrayReadV3:0", "rnn/while/Identity_2:0"], "rnn/while/cell/add"),
            node("Mul", &["rnn/while/cell/add:0", "rnn/kernel"], "rnn/while/cell/mul"),
            node("Tanh", &["rnn/while/cell/mul:0"], "rnn/while/cell/Tanh"),
            node("Identity", &["rnn/while/cell/Tanh:0"], "rnn/while/cell/out"),
            // bookkeeping
            node(
                "TensorArrayWriteV3",
                &[
                    "rnn/while/Enter_5:0",
                    "rnn/while/Identity:0",
                    "rnn/while/cell/out:0",
                    "rnn/while/Identity_1:0",
                ],
                "rnn/while/TensorArrayWrite/TensorArrayWriteV3",
            ),
            node("Constant", &[], "rnn/while/add/y"),
            node("Add", &["rnn/while/Identity:0", "rnn/while/add/y:0"], "rnn/while/add"),
            node("NextIteration", &["rnn/while/add:0"], "rnn/while/NextIteration"),
            node(
                "NextIteration",
                &["rnn/while/TensorArrayWrite/TensorArrayWriteV3:0"],
                "rnn/while/NextIteration_1",
            ),
            node("NextIteration", &["rnn/while/cell/Tanh:0"], "rnn/while/NextIteration_2"),
            // loop exit
            node("Exit", &["rnn/while/Switch_1:0"], "rnn/while/Exit_1"),
            node("Exit", &["rnn/while/Switch_2:0"], "rnn/while/Exit_2"),
            node(
                "TensorArrayGatherV3",
                &["rnn/TensorArray:0", "rnn/n:0", "rnn/while/Exit_1:0"],
                "rnn/TensorArrayStack/TensorArrayGatherV3",
            ),
        ]);

        let state_output = if self.state_exit_is_graph_output {
            STATE_EXIT
        } else {
            nodes.push(make_node("Identity", &[STATE_EXIT], &["h_n"], "h_final"));
            "h_n"
        };
        nodes.push(make_node("Identity", &[SEQUENCE_EXIT], &["y"], "y_final"));

        let value_info = [
            STATE_EXIT,
            SEQUENCE_EXIT,
            "rnn/while/TensorArrayReadV3:0",
            "rnn/while/Identity_2:0",
            "rnn/while/cell/add:0",
            "rnn/while/cell/mul:0",
            "rnn/while/cell/Tanh:0",
            "rnn/while/cell/out:0",
        ]
        .iter()
        .filter(|id| **id != state_output)
        .map(|id| make_tensor_value_info(id, 1, &[4]))
        .collect();

        GraphProto {
            name: "dynamic_rnn".to_string(),
            node: nodes,
            initializer: vec![TensorProto {
                name: "rnn/kernel".to_string(),
                dims: vec![4],
                data_type: 1,
                float_data: vec![0.5; 4],
                ..Default::default()
            }],
            input: vec![
                make_tensor_value_info("x", 1, &self.input_shape),
                make_tensor_value_info("h0", 1, &[4]),
            ],
            output: vec![
                make_tensor_value_info(state_output, 1, &[4]),
                make_tensor_value_info("y", 1, &[4]),
            ],
            value_info,
            ..Default::default()
        }
    }

    pub fn region(&self) -> LoopContext {
        let mut props = LoopProperties::new();
        props.add_variable(LoopVariable {
            enter_name: "rnn/while/Enter".to_string(),
            enter_input_id: "rnn/time:0".to_string(),
            is_sequence_accumulator: false,
            switch_true_output: TensorValueInfo::new("rnn/while/Identity:0", Some(vec![]), Some(6)),
            next_iteration_input: TensorValueInfo::new("rnn/while/add:0", Some(vec![]), Some(6)),
            exit: TensorValueInfo::absent(),
        });
        props.add_variable(LoopVariable {
            enter_name: "rnn/while/Enter_1".to_string(),
            enter_input_id: "rnn/TensorArray:1".to_string(),
            is_sequence_accumulator: true,
            switch_true_output: TensorValueInfo::new("rnn/while/Identity_1:0", None, None),
            next_iteration_input: info("rnn/while/cell/out:0"),
            exit: info(SEQUENCE_EXIT),
        });
        props.add_variable(LoopVariable {
            enter_name: "rnn/while/Enter_2".to_string(),
            enter_input_id: "h0".to_string(),
            is_sequence_accumulator: false,
            switch_true_output: info("rnn/while/Identity_2:0"),
            next_iteration_input: info("rnn/while/cell/Tanh:0"),
            exit: info(STATE_EXIT),
        });
        props.add_scan_input(ScanInput {
            body_input: info("rnn/while/TensorArrayReadV3:0"),
            initial_value: "x".to_string(),
        });

        let cell = CellGraph {
            nodes: vec![
                "rnn/while/cell/add".to_string(),
                "rnn/while/cell/mul".to_string(),
                "rnn/while/cell/Tanh".to_string(),
                "rnn/while/cell/out".to_string(),
            ],
            outputs: vec![info("rnn/while/cell/Tanh:0"), info("rnn/while/cell/out:0")],
        };

        LoopContext::new(WHILE_SCOPE, props, cell)
    }
}
